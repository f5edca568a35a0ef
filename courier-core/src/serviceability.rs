use serde::{Deserialize, Serialize};

/// Route/weight query for available courier options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceabilityQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_postcode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_postcode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// 1 for cash on delivery, 0 for prepaid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cod: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_international: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<u32>,
}

/// One courier offer for a serviceability query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryOption {
    pub courier_id: String,
    pub carrier_name: String,
    pub service_type: String,
    pub description: String,
    pub cost: f64,
    pub currency: String,
    pub estimated_delivery_days: Option<u32>,
    pub etd_raw: Option<String>,
    pub min_weight: f64,
    pub max_weight: f64,
}
