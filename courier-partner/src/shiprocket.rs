use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use courier_core::lookup::{BranchConfig, BranchConfigLookup, OrderDetails, OrderLookup};
use courier_core::serviceability::{DeliveryOption, ServiceabilityQuery};
use courier_core::{
    DeliveryError, DeliveryOrder, DeliveryPartner, DeliveryResult, DeliveryStatus, PartnerApiError, ShipmentReceipt,
};
use tracing::{info, warn};

use crate::client::ShiprocketClient;
use crate::dto::{CreateOrderItem, CreateOrderRequest};
use crate::status::StatusMapper;
use crate::strategy::PartnerStrategy;
use crate::SHIPROCKET;

const BILLING_COUNTRY: &str = "India";

pub struct ShiprocketStrategy {
    client: Arc<ShiprocketClient>,
    orders: Arc<dyn OrderLookup>,
    branches: Arc<dyn BranchConfigLookup>,
}

impl ShiprocketStrategy {
    pub fn new(
        client: Arc<ShiprocketClient>,
        orders: Arc<dyn OrderLookup>,
        branches: Arc<dyn BranchConfigLookup>,
    ) -> Self {
        Self { client, orders, branches }
    }

    async fn pickup_location(&self, order: &DeliveryOrder) -> DeliveryResult<String> {
        let config = self.branches.branch_config(&order.scope()).await?;
        config
            .and_then(|c: BranchConfig| c.shiprocket_pickup_location)
            .filter(|loc| !loc.trim().is_empty())
            .ok_or_else(|| {
                DeliveryError::Configuration(format!(
                    "Shiprocket pickup location not configured for branch {}",
                    order.branch_id
                ))
            })
    }

    async fn order_details(&self, order: &DeliveryOrder) -> DeliveryResult<OrderDetails> {
        self.orders
            .order_details(&order.organization_id, &order.order_id)
            .await?
            .ok_or_else(|| {
                DeliveryError::Configuration(format!("Order details not found for order {}", order.order_id))
            })
    }
}

#[async_trait]
impl PartnerStrategy for ShiprocketStrategy {
    fn partner(&self) -> DeliveryPartner {
        DeliveryPartner::Shiprocket
    }

    async fn create_shipment(&self, order: &DeliveryOrder) -> DeliveryResult<ShipmentReceipt> {
        let pickup_location = self.pickup_location(order).await?;
        let details = self.order_details(order).await?;
        let request = build_order_request(order, &details, pickup_location, Utc::now().date_naive())?;

        let created = self.client.create_order(&request).await?;

        let tracking_id = match created.awb() {
            Some(awb) => awb.to_string(),
            None => {
                let shipment_id = created.shipment_id.ok_or_else(|| {
                    PartnerApiError::new(SHIPROCKET, 200, "Order created without a shipment id or AWB")
                })?;
                info!(order_id = %order.order_id, shipment_id, "No AWB on create, assigning one");
                let assigned = self.client.assign_awb(shipment_id).await?;
                assigned
                    .awb()
                    .map(str::to_string)
                    .ok_or_else(|| PartnerApiError::new(SHIPROCKET, 200, "AWB assignment returned no AWB code"))?
            }
        };

        Ok(ShipmentReceipt {
            tracking_id,
            shipment_id: created.shipment_id,
            delivery_fee: created.charge_details.and_then(|c| c.total_charges),
        })
    }

    async fn cancel_shipment(&self, order: &DeliveryOrder, reason: &str) -> DeliveryResult<()> {
        let awb = order.partner_tracking_id.as_deref().ok_or_else(|| {
            DeliveryError::Configuration(format!("Delivery {} has no partner tracking id to cancel", order.id))
        })?;
        info!(delivery_id = %order.id, awb = %awb, reason = %reason, "Cancelling shipment with Shiprocket");
        self.client.cancel_order(awb).await?;
        Ok(())
    }

    async fn shipment_status(&self, order: &DeliveryOrder) -> DeliveryResult<DeliveryStatus> {
        let Some(awb) = order.partner_tracking_id.as_deref() else {
            return Ok(order.status);
        };

        match self.client.track_order(awb).await? {
            Some(raw) => Ok(StatusMapper::shiprocket(Some(&raw))),
            None => {
                warn!(awb = %awb, "Shiprocket returned no shipment status, keeping stored status");
                Ok(order.status)
            }
        }
    }

    async fn check_serviceability(&self, query: &ServiceabilityQuery) -> Vec<DeliveryOption> {
        self.client.check_serviceability(query).await
    }
}

fn text(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Map a delivery plus its enriched order into Shiprocket's create payload.
/// Every missing required field is reported at once.
pub fn build_order_request(
    order: &DeliveryOrder,
    details: &OrderDetails,
    pickup_location: String,
    order_date: NaiveDate,
) -> DeliveryResult<CreateOrderRequest> {
    let mut missing = Vec::new();
    let mut require = |field: &str, value: Option<String>| {
        if value.is_none() {
            missing.push(field.to_string());
        }
        value.unwrap_or_default()
    };

    let name = require(
        "recipientName",
        text(order.recipient_name.as_ref()).or_else(|| text(details.customer_name.as_ref())),
    );
    let phone = require(
        "recipientPhone",
        text(order.recipient_phone.as_ref()).or_else(|| text(details.customer_phone.as_ref())),
    );
    let address = require(
        "billingAddressLine1",
        text(details.billing_address_line1.as_ref()).or_else(|| text(order.dropoff_address.as_ref())),
    );
    let city = require("billingCity", text(details.billing_city.as_ref()));
    let pincode = require("billingPincode", text(details.billing_pincode.as_ref()));
    let state = require("billingState", text(details.billing_state.as_ref()));
    let payment_method = require("paymentMethod", text(details.payment_method.as_ref()));

    for (field, value) in [
        ("totalOrderValue", details.total_order_value),
        ("totalWeightKg", details.total_weight_kg),
        ("packageLengthCm", details.package_length_cm),
        ("packageBreadthCm", details.package_breadth_cm),
        ("packageHeightCm", details.package_height_cm),
    ] {
        if value.is_none() {
            missing.push(field.to_string());
        }
    }
    if details.items.is_empty() {
        missing.push("items".to_string());
    }

    let mut items = Vec::with_capacity(details.items.len());
    for (idx, line) in details.items.iter().enumerate() {
        match (text(line.name.as_ref()), text(line.sku.as_ref()), line.quantity, line.unit_price) {
            (Some(name), Some(sku), Some(units), Some(price)) if units > 0 => items.push(CreateOrderItem {
                name,
                sku,
                units,
                selling_price: price.to_string(),
                hsn: line.hsn_code,
            }),
            _ => missing.push(format!("items[{}]", idx)),
        }
    }

    if !missing.is_empty() {
        return Err(DeliveryError::Configuration(format!(
            "Incomplete order details for order {}: missing {}",
            order.order_id,
            missing.join(", ")
        )));
    }

    Ok(CreateOrderRequest {
        order_id: order.order_id.clone(),
        order_date: order_date.format("%Y-%m-%d").to_string(),
        pickup_location,
        billing_customer_name: name,
        billing_last_name: None,
        billing_address: address,
        billing_address_2: text(details.billing_address_line2.as_ref()),
        billing_city: city,
        billing_pincode: pincode,
        billing_state: state,
        billing_country: BILLING_COUNTRY.to_string(),
        billing_email: text(details.customer_email.as_ref()),
        billing_phone: phone,
        shipping_is_billing: true,
        order_items: items,
        payment_method,
        sub_total: details.total_order_value.unwrap_or_default(),
        length: details.package_length_cm.unwrap_or_default(),
        breadth: details.package_breadth_cm.unwrap_or_default(),
        height: details.package_height_cm.unwrap_or_default(),
        weight: details.total_weight_kg.unwrap_or_default(),
    })
}
