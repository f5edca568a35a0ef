use std::sync::Arc;

use axum::http::HeaderName;
use courier_delivery::{DeliveryService, WebhookAuthenticator, WebhookReconciler};

#[derive(Clone)]
pub struct AppState {
    pub deliveries: Arc<DeliveryService>,
    pub reconciler: Arc<WebhookReconciler>,
    pub webhook_auth: Arc<WebhookAuthenticator>,
    /// Header carrying the webhook shared secret.
    pub webhook_header: HeaderName,
}
