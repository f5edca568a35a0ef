pub mod mock;
pub mod orchestration;
pub mod webhook;

pub use mock::MockPartnerStrategy;
pub use orchestration::{DeliveryService, TrackingSnapshot};
pub use webhook::{ReconcileOutcome, StatusEvent, WebhookAuthenticator, WebhookReconciler};
