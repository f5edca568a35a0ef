use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DeliveryError;

/// Canonical delivery status. Every partner vocabulary is mapped into this set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Accepted,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Accepted => "ACCEPTED",
            DeliveryStatus::PickedUp => "PICKED_UP",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// Position along the forward lifecycle. Cancellation sits outside it.
    fn rank(&self) -> u8 {
        match self {
            DeliveryStatus::Pending => 0,
            DeliveryStatus::Accepted => 1,
            DeliveryStatus::PickedUp => 2,
            DeliveryStatus::InTransit => 3,
            DeliveryStatus::Delivered => 4,
            DeliveryStatus::Cancelled => 5,
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = DeliveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(DeliveryStatus::Pending),
            "ACCEPTED" => Ok(DeliveryStatus::Accepted),
            "PICKED_UP" => Ok(DeliveryStatus::PickedUp),
            "IN_TRANSIT" => Ok(DeliveryStatus::InTransit),
            "DELIVERED" => Ok(DeliveryStatus::Delivered),
            "CANCELLED" => Ok(DeliveryStatus::Cancelled),
            other => Err(DeliveryError::Validation(format!("Unknown delivery status: {}", other))),
        }
    }
}

/// Closed set of logistics partners this service can dispatch to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryPartner {
    Shiprocket,
}

impl DeliveryPartner {
    pub const ALL: [DeliveryPartner; 1] = [DeliveryPartner::Shiprocket];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryPartner::Shiprocket => "SHIPROCKET",
        }
    }
}

impl fmt::Display for DeliveryPartner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryPartner {
    type Err = DeliveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryPartner::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DeliveryError::Configuration(format!("No delivery strategy found for partner: {}", s)))
    }
}

/// Organization + branch of the caller. Every read and write is scoped by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    pub organization_id: String,
    pub branch_id: String,
}

impl TenantScope {
    pub fn new(organization_id: impl Into<String>, branch_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            branch_id: branch_id.into(),
        }
    }
}

/// What a partner hands back once it has accepted a shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentReceipt {
    pub tracking_id: String,
    pub shipment_id: Option<i64>,
    pub delivery_fee: Option<f64>,
}

/// Client-initiated delivery request, before tenancy is attached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryRequest {
    #[serde(default)]
    pub order_id: String,
    pub preferred_partner: Option<String>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
}

impl CreateDeliveryRequest {
    pub fn validate(&self) -> Result<(), DeliveryError> {
        let order_id = self.order_id.trim();
        if order_id.is_empty() || order_id.chars().count() > 50 {
            return Err(DeliveryError::Validation(
                "orderId must be between 1 and 50 characters.".to_string(),
            ));
        }
        // used as a path segment when calling the order service
        let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
        if !order_id.chars().all(allowed) || order_id.starts_with('.') {
            return Err(DeliveryError::Validation(
                "orderId may only contain letters, digits, '-', '_' and '.'.".to_string(),
            ));
        }

        if let Some(name) = &self.recipient_name {
            if name.chars().count() > 100 {
                return Err(DeliveryError::Validation(
                    "recipientName cannot exceed 100 characters.".to_string(),
                ));
            }
        }

        if let Some(phone) = &self.recipient_phone {
            let len = phone.chars().count();
            if !(7..=20).contains(&len) {
                return Err(DeliveryError::Validation(
                    "recipientPhone must be between 7 and 20 characters.".to_string(),
                ));
            }
            let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-' | '.' | '/' | ' ');
            if !phone.chars().all(allowed) {
                return Err(DeliveryError::Validation("Invalid phone number format.".to_string()));
            }
        }

        Ok(())
    }
}

/// Outcome of applying a partner status to a stored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Applied { from: DeliveryStatus, to: DeliveryStatus },
    Unchanged,
    /// Incoming status is behind the stored one (out-of-order delivery).
    Stale { current: DeliveryStatus, incoming: DeliveryStatus },
    /// Stored order already reached a terminal state.
    Terminal { current: DeliveryStatus, incoming: DeliveryStatus },
}

/// The delivery aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryOrder {
    pub id: Uuid,
    pub organization_id: String,
    pub branch_id: String,
    pub order_id: String,
    pub partner_name: DeliveryPartner,
    pub partner_tracking_id: Option<String>,
    pub partner_shipment_id: Option<i64>,
    pub status: DeliveryStatus,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub delivery_fee: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl DeliveryOrder {
    /// Build a fresh order in `PENDING`.
    pub fn new(scope: &TenantScope, partner: DeliveryPartner, request: &CreateDeliveryRequest) -> Self {
        let now = Utc::now();
        Self {
            id: courier_shared::new_delivery_id(),
            organization_id: scope.organization_id.clone(),
            branch_id: scope.branch_id.clone(),
            order_id: request.order_id.trim().to_string(),
            partner_name: partner,
            partner_tracking_id: None,
            partner_shipment_id: None,
            status: DeliveryStatus::Pending,
            pickup_address: request.pickup_address.clone(),
            dropoff_address: request.dropoff_address.clone(),
            recipient_name: request.recipient_name.clone(),
            recipient_phone: request.recipient_phone.clone(),
            delivery_fee: None,
            notes: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
        }
    }

    pub fn scope(&self) -> TenantScope {
        TenantScope::new(self.organization_id.clone(), self.branch_id.clone())
    }

    pub fn is_owned_by(&self, organization_id: &str) -> bool {
        self.organization_id == organization_id
    }

    /// Record the partner's acceptance: `PENDING` -> `ACCEPTED`.
    pub fn accept(&mut self, receipt: ShipmentReceipt) {
        self.partner_tracking_id = Some(receipt.tracking_id);
        self.partner_shipment_id = receipt.shipment_id;
        if receipt.delivery_fee.is_some() {
            self.delivery_fee = receipt.delivery_fee;
        }
        self.status = DeliveryStatus::Accepted;
        self.updated_at = Utc::now();
    }

    /// Apply a status reported by the partner. Forward-only, except that
    /// cancellation is accepted from any non-terminal state.
    pub fn apply_status(&mut self, incoming: DeliveryStatus, now: DateTime<Utc>) -> StatusChange {
        let current = self.status;

        if incoming == current {
            return StatusChange::Unchanged;
        }
        if current.is_terminal() {
            return StatusChange::Terminal { current, incoming };
        }
        if incoming != DeliveryStatus::Cancelled && incoming.rank() < current.rank() {
            return StatusChange::Stale { current, incoming };
        }

        self.status = incoming;
        self.updated_at = now;
        if incoming == DeliveryStatus::Delivered && self.delivered_at.is_none() {
            self.delivered_at = Some(now);
        }

        StatusChange::Applied { from: current, to: incoming }
    }

    /// Local cancellation. Only non-terminal orders can be cancelled.
    pub fn cancel(&mut self, reason: &str) -> Result<(), DeliveryError> {
        if self.status.is_terminal() {
            return Err(DeliveryError::InvalidTransition {
                from: self.status,
                to: DeliveryStatus::Cancelled,
            });
        }

        self.status = DeliveryStatus::Cancelled;
        self.append_note(&format!("Cancelled by user. Reason: {}", reason));
        Ok(())
    }

    pub fn append_note(&mut self, note: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, note),
            _ => note.to_string(),
        });
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn order() -> DeliveryOrder {
        let request = CreateDeliveryRequest {
            order_id: "O-1".to_string(),
            recipient_name: Some("Asha".to_string()),
            ..Default::default()
        };
        DeliveryOrder::new(&TenantScope::new("org-1", "br-1"), DeliveryPartner::Shiprocket, &request)
    }

    fn accepted() -> DeliveryOrder {
        let mut order = order();
        order.accept(ShipmentReceipt {
            tracking_id: "AWB-123".to_string(),
            shipment_id: Some(42),
            delivery_fee: Some(79.5),
        });
        order
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = order();
        assert_eq!(order.status, DeliveryStatus::Pending);
        assert!(order.partner_tracking_id.is_none());
        assert_eq!(order.order_id, "O-1");
        assert!(order.is_owned_by("org-1"));
        assert!(!order.is_owned_by("org-2"));
    }

    #[test]
    fn test_accept_records_receipt() {
        let order = accepted();
        assert_eq!(order.status, DeliveryStatus::Accepted);
        assert_eq!(order.partner_tracking_id.as_deref(), Some("AWB-123"));
        assert_eq!(order.partner_shipment_id, Some(42));
        assert_eq!(order.delivery_fee, Some(79.5));
    }

    #[test]
    fn test_delivered_at_set_once() {
        let mut order = accepted();
        let first = Utc::now();

        let change = order.apply_status(DeliveryStatus::Delivered, first);
        assert_eq!(
            change,
            StatusChange::Applied { from: DeliveryStatus::Accepted, to: DeliveryStatus::Delivered }
        );
        assert_eq!(order.delivered_at, Some(first));

        let later = first + Duration::minutes(10);
        assert_eq!(order.apply_status(DeliveryStatus::Delivered, later), StatusChange::Unchanged);
        assert_eq!(order.delivered_at, Some(first));
    }

    #[test]
    fn test_out_of_order_status_is_stale() {
        let mut order = accepted();
        order.apply_status(DeliveryStatus::InTransit, Utc::now());

        let change = order.apply_status(DeliveryStatus::PickedUp, Utc::now());
        assert_eq!(
            change,
            StatusChange::Stale { current: DeliveryStatus::InTransit, incoming: DeliveryStatus::PickedUp }
        );
        assert_eq!(order.status, DeliveryStatus::InTransit);
    }

    #[test]
    fn test_terminal_order_ignores_updates() {
        let mut order = accepted();
        order.apply_status(DeliveryStatus::Delivered, Utc::now());

        let change = order.apply_status(DeliveryStatus::Cancelled, Utc::now());
        assert!(matches!(change, StatusChange::Terminal { .. }));
        assert_eq!(order.status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_cancel_appends_reason() {
        let mut order = accepted();
        order.notes = Some("Leave at reception".to_string());

        order.cancel("Customer changed mind").unwrap();

        assert_eq!(order.status, DeliveryStatus::Cancelled);
        assert_eq!(
            order.notes.as_deref(),
            Some("Leave at reception\nCancelled by user. Reason: Customer changed mind")
        );
        assert!(order.cancel("again please").is_err());
    }

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("in_transit".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::InTransit);
        assert!("LOST".parse::<DeliveryStatus>().is_err());
        assert_eq!("shiprocket".parse::<DeliveryPartner>().unwrap(), DeliveryPartner::Shiprocket);
        assert!(matches!(
            "DUNZO".parse::<DeliveryPartner>(),
            Err(DeliveryError::Configuration(_))
        ));
    }

    #[test]
    fn test_request_validation() {
        let mut request = CreateDeliveryRequest {
            order_id: "O-1".to_string(),
            recipient_phone: Some("+91 98450-12345".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_ok());

        request.recipient_phone = Some("call me".to_string());
        assert!(request.validate().is_err());

        request.recipient_phone = None;
        request.order_id = "   ".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_order_id_rejects_path_characters() {
        for bad in ["../../org-2/orders/O-9", "O/9", "..", ".hidden", "O 9", "O%2F9", "O?x=1"] {
            let request = CreateDeliveryRequest {
                order_id: bad.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(request.validate(), Err(DeliveryError::Validation(_))),
                "{bad} should be rejected"
            );
        }

        for good in ["O-1", "ORD_2026.03.01", "1042"] {
            let request = CreateDeliveryRequest {
                order_id: good.to_string(),
                ..Default::default()
            };
            assert!(request.validate().is_ok(), "{good} should be accepted");
        }
    }
}
