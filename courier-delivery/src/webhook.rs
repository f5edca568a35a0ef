use std::sync::Arc;

use chrono::Utc;
use courier_core::{
    DeliveryError, DeliveryPartner, DeliveryResult, DeliveryStatus, DeliveryStore, StatusChange, StoreError,
};
use courier_partner::dto::ShiprocketWebhook;
use courier_partner::StatusMapper;
use courier_shared::Masked;
use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Shared-secret check for inbound partner callbacks.
pub struct WebhookAuthenticator {
    secret: Masked<String>,
}

impl WebhookAuthenticator {
    pub fn new(secret: Masked<String>) -> Self {
        Self { secret }
    }

    /// Constant-time comparison of the presented header value against the secret.
    /// An unset secret rejects everything.
    pub fn verify(&self, presented: Option<&str>) -> DeliveryResult<()> {
        let expected = self.secret.expose().as_bytes();
        if expected.is_empty() {
            warn!("Webhook secret is not configured, rejecting callback");
            return Err(DeliveryError::AccessDenied("Webhook authentication is not configured".to_string()));
        }

        let Some(presented) = presented else {
            warn!("Webhook received without authentication header");
            return Err(DeliveryError::AccessDenied("Missing webhook token".to_string()));
        };

        if bool::from(presented.as_bytes().ct_eq(expected)) {
            Ok(())
        } else {
            warn!("SECURITY ALERT: webhook received with invalid token");
            Err(DeliveryError::AccessDenied("Invalid webhook token".to_string()))
        }
    }
}

/// Partner-agnostic status push, keyed by tracking id.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub partner: DeliveryPartner,
    pub tracking_id: String,
    pub raw_status: Option<String>,
}

impl StatusEvent {
    /// `None` when the payload carries no AWB to reconcile against.
    pub fn from_shiprocket(payload: ShiprocketWebhook) -> Option<Self> {
        let tracking_id = payload.awb.map(|awb| awb.trim().to_string()).filter(|awb| !awb.is_empty())?;
        Some(Self {
            partner: DeliveryPartner::Shiprocket,
            tracking_id,
            raw_status: payload.current_status,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No delivery carries this tracking id.
    UnknownTracking,
    Applied { from: DeliveryStatus, to: DeliveryStatus },
    /// Same status as stored; replay or duplicate delivery.
    Duplicate,
    Stale { current: DeliveryStatus, incoming: DeliveryStatus },
    AlreadyTerminal { current: DeliveryStatus, incoming: DeliveryStatus },
}

/// Conditional writes lost to a concurrent update before giving up.
const MAX_ATTEMPTS: usize = 5;

/// Applies partner status pushes to stored deliveries. At most one write per real transition.
pub struct WebhookReconciler {
    store: Arc<dyn DeliveryStore>,
}

impl WebhookReconciler {
    pub fn new(store: Arc<dyn DeliveryStore>) -> Self {
        Self { store }
    }

    /// Apply one event. The write is conditional on the status that was read,
    /// so a concurrent update makes this event re-read and re-classify.
    pub async fn reconcile(&self, event: &StatusEvent) -> DeliveryResult<ReconcileOutcome> {
        for attempt in 1..=MAX_ATTEMPTS {
            let Some(mut order) = self.store.find_by_tracking_id(&event.tracking_id).await? else {
                warn!(
                    partner = %event.partner,
                    tracking_id = %event.tracking_id,
                    "Webhook for unknown tracking id, ignoring"
                );
                return Ok(ReconcileOutcome::UnknownTracking);
            };

            let incoming = StatusMapper::map(order.partner_name, event.raw_status.as_deref());

            let outcome = match order.apply_status(incoming, Utc::now()) {
                StatusChange::Applied { from, to } => {
                    if !self.store.save_if_status(&order, from).await? {
                        debug!(delivery_id = %order.id, attempt, "Delivery changed concurrently, re-reading");
                        continue;
                    }
                    info!(delivery_id = %order.id, from = %from, to = %to, "Delivery status updated from webhook");
                    ReconcileOutcome::Applied { from, to }
                }
                StatusChange::Unchanged => {
                    info!(delivery_id = %order.id, status = %incoming, "Webhook status already applied");
                    ReconcileOutcome::Duplicate
                }
                StatusChange::Stale { current, incoming } => {
                    warn!(delivery_id = %order.id, current = %current, incoming = %incoming, "Out-of-order webhook dropped");
                    ReconcileOutcome::Stale { current, incoming }
                }
                StatusChange::Terminal { current, incoming } => {
                    warn!(
                        delivery_id = %order.id,
                        current = %current,
                        incoming = %incoming,
                        "Webhook for delivery in terminal state dropped"
                    );
                    ReconcileOutcome::AlreadyTerminal { current, incoming }
                }
            };

            return Ok(outcome);
        }

        Err(DeliveryError::Store(StoreError::Backend(format!(
            "delivery with tracking id {} kept changing during reconciliation",
            event.tracking_id
        ))))
    }

    /// Reconcile on a background task. Failures are logged and never reach the caller.
    pub fn dispatch(self: &Arc<Self>, event: StatusEvent) -> JoinHandle<()> {
        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = reconciler.reconcile(&event).await {
                error!(
                    partner = %event.partner,
                    tracking_id = %event.tracking_id,
                    error = %e,
                    "Webhook reconciliation failed"
                );
            }
        })
    }
}
