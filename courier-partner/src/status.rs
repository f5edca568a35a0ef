use courier_core::{DeliveryPartner, DeliveryStatus};
use tracing::warn;

/// Shiprocket vocabulary, upper-cased with single spaces.
const SHIPROCKET_STATUSES: &[(&str, DeliveryStatus)] = &[
    ("NEW", DeliveryStatus::Accepted),
    ("ACCEPTED", DeliveryStatus::Accepted),
    ("AWB ASSIGNED", DeliveryStatus::Accepted),
    ("LABEL GENERATED", DeliveryStatus::Accepted),
    ("PICKUP SCHEDULED", DeliveryStatus::Accepted),
    ("PICKUP GENERATED", DeliveryStatus::Accepted),
    ("PICKED UP", DeliveryStatus::PickedUp),
    ("SHIPPED", DeliveryStatus::PickedUp),
    ("IN TRANSIT", DeliveryStatus::InTransit),
    ("OUT FOR DELIVERY", DeliveryStatus::InTransit),
    ("REACHED AT DESTINATION HUB", DeliveryStatus::InTransit),
    ("DELIVERED", DeliveryStatus::Delivered),
    ("CANCELLED", DeliveryStatus::Cancelled),
    ("RTO INITIATED", DeliveryStatus::Cancelled),
    ("RTO DELIVERED", DeliveryStatus::Cancelled),
];

/// Translates partner status strings into [`DeliveryStatus`].
///
/// Pure: the same input always yields the same output. Missing or blank
/// input means the partner has nothing to report yet and maps to `PENDING`.
/// Anything outside the known vocabulary maps to `IN_TRANSIT` with a warning.
pub struct StatusMapper;

impl StatusMapper {
    pub fn map(partner: DeliveryPartner, raw: Option<&str>) -> DeliveryStatus {
        match partner {
            DeliveryPartner::Shiprocket => Self::shiprocket(raw),
        }
    }

    pub fn shiprocket(raw: Option<&str>) -> DeliveryStatus {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return DeliveryStatus::Pending;
        };

        let key = normalize(raw);
        match SHIPROCKET_STATUSES.iter().find(|(name, _)| *name == key) {
            Some((_, status)) => *status,
            None => {
                warn!(partner = "SHIPROCKET", raw_status = %raw, "Unmapped partner status, treating as IN_TRANSIT");
                DeliveryStatus::InTransit
            }
        }
    }
}

/// "out_for  delivery" -> "OUT FOR DELIVERY"
fn normalize(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}
