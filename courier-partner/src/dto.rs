//! Shiprocket wire types.
//!
//! Response types are lenient: every field is optional and unknown fields
//! are ignored, since Shiprocket omits or retypes fields between releases.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthResponse {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub order_id: String,
    /// `yyyy-MM-dd`
    pub order_date: String,
    pub pickup_location: String,
    pub billing_customer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_last_name: Option<String>,
    pub billing_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address_2: Option<String>,
    pub billing_city: String,
    pub billing_pincode: String,
    pub billing_state: String,
    pub billing_country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_email: Option<String>,
    pub billing_phone: String,
    pub shipping_is_billing: bool,
    pub order_items: Vec<CreateOrderItem>,
    pub payment_method: String,
    pub sub_total: f64,
    pub length: f64,
    pub breadth: f64,
    pub height: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderItem {
    pub name: String,
    pub sku: String,
    pub units: u32,
    /// Shiprocket expects the price as a string.
    pub selling_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsn: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateOrderResponse {
    #[serde(deserialize_with = "lenient_i64")]
    pub order_id: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub shipment_id: Option<i64>,
    pub awb_code: Option<String>,
    pub courier_name: Option<String>,
    pub charge_details: Option<ChargeDetails>,
}

impl CreateOrderResponse {
    pub fn awb(&self) -> Option<&str> {
        non_blank(self.awb_code.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChargeDetails {
    pub total_charges: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AssignAwbRequest {
    pub shipment_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<i64>,
}

/// Shiprocket has shipped both a flat `data` object and a `response.data`
/// envelope for this endpoint; both are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssignAwbResponse {
    pub data: Option<AwbData>,
    pub response: Option<AwbEnvelope>,
}

impl AssignAwbResponse {
    pub fn awb(&self) -> Option<&str> {
        let flat = self.data.as_ref().and_then(|d| d.awb_code.as_deref());
        let nested = self
            .response
            .as_ref()
            .and_then(|r| r.data.as_ref())
            .and_then(|d| d.awb_code.as_deref());
        non_blank(flat).or_else(|| non_blank(nested))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AwbEnvelope {
    pub data: Option<AwbData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AwbData {
    pub awb_code: Option<String>,
    pub courier_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelOrderRequest<'a> {
    pub awb_codes: Vec<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrackingResponse {
    pub tracking_data: Option<TrackingData>,
}

impl TrackingResponse {
    pub fn shipment_status(&self) -> Option<&str> {
        non_blank(self.tracking_data.as_ref()?.shipment_status.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrackingData {
    #[serde(deserialize_with = "lenient_string")]
    pub shipment_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceabilityResponse {
    pub data: Option<ServiceabilityData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceabilityData {
    pub available_courier_companies: Vec<CourierCompany>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CourierCompany {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub courier_company_id: Option<i64>,
    pub courier_name: Option<String>,
    pub rate: Option<f64>,
    pub min_weight: Option<f64>,
    pub max_weight: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub etd: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub estimated_delivery_days: Option<String>,
    pub description: Option<String>,
}

/// Status push sent by Shiprocket to the webhook endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShiprocketWebhook {
    pub awb: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    pub shipment_id: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    pub order_id: Option<String>,
    pub current_status: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts a JSON string or number.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts a JSON number or numeric string.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_response_with_blank_awb() {
        let json = r#"{"order_id": 7781, "shipment_id": "5521", "status": "NEW", "awb_code": "", "status_code": 1}"#;
        let resp: CreateOrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.order_id, Some(7781));
        assert_eq!(resp.shipment_id, Some(5521));
        assert_eq!(resp.awb(), None);
    }

    #[test]
    fn test_assign_awb_accepts_both_shapes() {
        let flat: AssignAwbResponse = serde_json::from_str(r#"{"data": {"awb_code": "AWB-1"}}"#).unwrap();
        assert_eq!(flat.awb(), Some("AWB-1"));

        let nested: AssignAwbResponse =
            serde_json::from_str(r#"{"awb_assign_status": 1, "response": {"data": {"awb_code": "AWB-2"}}}"#).unwrap();
        assert_eq!(nested.awb(), Some("AWB-2"));
    }

    #[test]
    fn test_tracking_status_missing_or_numeric() {
        let missing: TrackingResponse = serde_json::from_str(r#"{"tracking_data": {}}"#).unwrap();
        assert_eq!(missing.shipment_status(), None);

        let numeric: TrackingResponse = serde_json::from_str(r#"{"tracking_data": {"shipment_status": 7}}"#).unwrap();
        assert_eq!(numeric.shipment_status(), Some("7"));
    }

    #[test]
    fn test_cancel_body_shape() {
        let body = serde_json::to_value(CancelOrderRequest { awb_codes: vec!["AWB-123"] }).unwrap();
        assert_eq!(body, serde_json::json!({ "awb_codes": ["AWB-123"] }));
    }

    #[test]
    fn test_webhook_payload() {
        let json = r#"{"awb": "AWB-123", "shipment_id": 99, "order_id": 1001, "current_status": "DELIVERED", "courier_name": "Delhivery"}"#;
        let hook: ShiprocketWebhook = serde_json::from_str(json).unwrap();
        assert_eq!(hook.awb.as_deref(), Some("AWB-123"));
        assert_eq!(hook.order_id.as_deref(), Some("1001"));
        assert_eq!(hook.current_status.as_deref(), Some("DELIVERED"));
    }
}
