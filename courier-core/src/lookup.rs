use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::models::TenantScope;

/// Enriched order as served by the order service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderDetails {
    pub order_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// "Prepaid" or "COD"
    pub payment_method: Option<String>,
    pub total_order_value: Option<f64>,
    pub billing_address_line1: Option<String>,
    pub billing_address_line2: Option<String>,
    pub billing_city: Option<String>,
    pub billing_pincode: Option<String>,
    pub billing_state: Option<String>,
    pub total_weight_kg: Option<f64>,
    pub package_length_cm: Option<f64>,
    pub package_breadth_cm: Option<f64>,
    pub package_height_cm: Option<f64>,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderLine {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<f64>,
    pub hsn_code: Option<u32>,
}

/// Branch settings served by the organization service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BranchConfig {
    pub branch_id: Option<String>,
    pub branch_name: Option<String>,
    /// Pickup nickname registered with Shiprocket; must match exactly.
    pub shiprocket_pickup_location: Option<String>,
    pub default_courier_partner: Option<String>,
    pub pickup_pincode: Option<String>,
}

#[async_trait]
pub trait OrderLookup: Send + Sync {
    async fn order_details(
        &self,
        organization_id: &str,
        order_id: &str,
    ) -> Result<Option<OrderDetails>, LookupError>;
}

#[async_trait]
pub trait BranchConfigLookup: Send + Sync {
    async fn branch_config(&self, scope: &TenantScope) -> Result<Option<BranchConfig>, LookupError>;
}
