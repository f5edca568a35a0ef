use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use courier_core::DeliveryPartner;
use courier_delivery::StatusEvent;
use courier_partner::dto::ShiprocketWebhook;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/webhooks/{partner}", post(receive_partner_webhook))
}

/// POST /api/v1/webhooks/{partner}
/// Verify the shared secret, acknowledge, and reconcile in the background.
async fn receive_partner_webhook(
    State(state): State<AppState>,
    Path(partner): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let presented = headers.get(&state.webhook_header).and_then(|v| v.to_str().ok());
    state.webhook_auth.verify(presented)?;

    let partner = match partner.parse::<DeliveryPartner>() {
        Ok(partner) => partner,
        Err(_) => {
            tracing::warn!(partner = %partner, "Webhook for unknown partner ignored");
            return Ok(StatusCode::OK);
        }
    };

    let event = match partner {
        DeliveryPartner::Shiprocket => match serde_json::from_slice::<ShiprocketWebhook>(&body) {
            Ok(payload) => {
                tracing::info!(
                    awb = ?payload.awb,
                    shipment_id = ?payload.shipment_id,
                    order_id = ?payload.order_id,
                    status = ?payload.current_status,
                    "Received Shiprocket webhook"
                );
                StatusEvent::from_shiprocket(payload)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable Shiprocket webhook body ignored");
                None
            }
        },
    };

    match event {
        Some(event) => {
            // fire-and-forget: the partner gets its 200 before reconciliation finishes
            let _handle = state.reconciler.dispatch(event);
        }
        None => tracing::warn!(partner = %partner, "Webhook without tracking id ignored"),
    }

    Ok(StatusCode::OK)
}
