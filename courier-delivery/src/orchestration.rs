use std::sync::Arc;

use courier_core::serviceability::{DeliveryOption, ServiceabilityQuery};
use courier_core::{
    CreateDeliveryRequest, DeliveryError, DeliveryOrder, DeliveryPartner, DeliveryResult, DeliveryStatus,
    DeliveryStore, StoreError, TenantScope,
};
use courier_partner::StrategyRegistry;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Conditional writes lost to a concurrent update before giving up.
const MAX_SAVE_ATTEMPTS: usize = 5;

/// Stored vs. live status for one delivery.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
    pub delivery_id: Uuid,
    pub partner_name: DeliveryPartner,
    pub partner_tracking_id: Option<String>,
    pub stored_status: DeliveryStatus,
    pub live_status: DeliveryStatus,
}

/// Tenant-scoped command surface for deliveries.
pub struct DeliveryService {
    registry: Arc<StrategyRegistry>,
    store: Arc<dyn DeliveryStore>,
    default_partner: DeliveryPartner,
}

impl DeliveryService {
    pub fn new(registry: Arc<StrategyRegistry>, store: Arc<dyn DeliveryStore>, default_partner: DeliveryPartner) -> Self {
        Self {
            registry,
            store,
            default_partner,
        }
    }

    /// Book a delivery with the partner and persist it as `ACCEPTED`.
    ///
    /// Nothing is written unless the partner returns a tracking id.
    pub async fn create(&self, scope: &TenantScope, request: CreateDeliveryRequest) -> DeliveryResult<DeliveryOrder> {
        request.validate()?;

        let partner = match request.preferred_partner.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.parse()?,
            _ => self.default_partner,
        };

        let order_id = request.order_id.trim();
        if self.store.find_by_order_id(scope, order_id).await?.is_some() {
            warn!(
                organization_id = %scope.organization_id,
                branch_id = %scope.branch_id,
                order_id = %order_id,
                "Duplicate delivery request"
            );
            return Err(DeliveryError::DuplicateRequest(format!(
                "A delivery for order {} already exists",
                order_id
            )));
        }

        let strategy = self.registry.resolve(partner)?;
        let mut order = DeliveryOrder::new(scope, partner, &request);
        info!(delivery_id = %order.id, order_id = %order.order_id, partner = %partner, "Creating delivery");

        let receipt = strategy.create_shipment(&order).await.map_err(|e| {
            error!(delivery_id = %order.id, order_id = %order.order_id, error = %e, "Partner rejected shipment");
            e
        })?;

        order.accept(receipt);
        self.store.save(&order).await?;

        info!(
            delivery_id = %order.id,
            tracking_id = ?order.partner_tracking_id,
            "Delivery accepted by partner"
        );
        Ok(order)
    }

    /// Fetch one delivery owned by the caller's organization.
    pub async fn get_by_id(&self, scope: &TenantScope, id: Uuid) -> DeliveryResult<DeliveryOrder> {
        let order = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| DeliveryError::NotFound(format!("Delivery {} not found", id)))?;

        if !order.is_owned_by(&scope.organization_id) {
            warn!(
                delivery_id = %id,
                caller_organization = %scope.organization_id,
                owner_organization = %order.organization_id,
                "Cross-tenant delivery access attempt"
            );
            return Err(DeliveryError::AccessDenied(format!(
                "Delivery {} does not belong to organization {}",
                id, scope.organization_id
            )));
        }

        Ok(order)
    }

    pub async fn list(&self, scope: &TenantScope, status: Option<DeliveryStatus>) -> DeliveryResult<Vec<DeliveryOrder>> {
        let orders = match status {
            Some(status) => self.store.find_by_scope_and_status(scope, status).await?,
            None => self.store.find_by_scope(scope).await?,
        };
        Ok(orders)
    }

    /// Cancel locally, asking the partner to cancel first when a shipment exists.
    ///
    /// A partner-side failure is logged and noted on the order; the local
    /// transition to `CANCELLED` still happens.
    pub async fn cancel(&self, scope: &TenantScope, id: Uuid, reason: &str) -> DeliveryResult<DeliveryOrder> {
        let reason = reason.trim();
        let len = reason.chars().count();
        if !(5..=255).contains(&len) {
            return Err(DeliveryError::Validation(
                "reason must be between 5 and 255 characters.".to_string(),
            ));
        }

        let mut order = self.get_by_id(scope, id).await?;
        if order.status.is_terminal() {
            return Err(DeliveryError::InvalidTransition {
                from: order.status,
                to: DeliveryStatus::Cancelled,
            });
        }

        let mut partner_failure = None;
        if order.partner_tracking_id.is_some() {
            let outcome = match self.registry.resolve(order.partner_name) {
                Ok(strategy) => strategy.cancel_shipment(&order, reason).await,
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                error!(delivery_id = %order.id, error = %e, "Partner cancellation failed, cancelling locally");
                partner_failure = Some(format!("Partner cancellation failed: {}", e));
            }
        }

        // a webhook may land while the partner call is in flight
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let expected = order.status;
            if let Some(note) = &partner_failure {
                order.append_note(note);
            }
            order.cancel(reason)?;

            if self.store.save_if_status(&order, expected).await? {
                info!(delivery_id = %order.id, "Delivery cancelled");
                return Ok(order);
            }

            warn!(delivery_id = %order.id, attempt, "Delivery changed during cancellation, re-reading");
            order = self.get_by_id(scope, id).await?;
        }

        Err(DeliveryError::Store(StoreError::Backend(format!(
            "delivery {} kept changing during cancellation",
            id
        ))))
    }

    /// Live partner status for a delivery. Read-only.
    pub async fn track(&self, scope: &TenantScope, id: Uuid) -> DeliveryResult<TrackingSnapshot> {
        let order = self.get_by_id(scope, id).await?;
        let strategy = self.registry.resolve(order.partner_name)?;
        let live_status = strategy.shipment_status(&order).await?;

        Ok(TrackingSnapshot {
            delivery_id: order.id,
            partner_name: order.partner_name,
            partner_tracking_id: order.partner_tracking_id,
            stored_status: order.status,
            live_status,
        })
    }

    /// Courier options for a route. Partner failures degrade to an empty list.
    pub async fn serviceability(
        &self,
        partner: Option<DeliveryPartner>,
        query: &ServiceabilityQuery,
    ) -> DeliveryResult<Vec<DeliveryOption>> {
        let strategy = self.registry.resolve(partner.unwrap_or(self.default_partner))?;
        Ok(strategy.check_serviceability(query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPartnerStrategy;
    use courier_core::PartnerApiError;
    use courier_store::InMemoryDeliveryStore;

    struct Fixture {
        service: DeliveryService,
        store: Arc<InMemoryDeliveryStore>,
        partner: Arc<MockPartnerStrategy>,
    }

    fn fixture_with(partner: MockPartnerStrategy) -> Fixture {
        let partner = Arc::new(partner);
        let store = Arc::new(InMemoryDeliveryStore::new());
        let registry = Arc::new(StrategyRegistry::default().with(partner.clone()));
        Fixture {
            service: DeliveryService::new(registry, store.clone(), DeliveryPartner::Shiprocket),
            store,
            partner,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockPartnerStrategy::new())
    }

    fn scope() -> TenantScope {
        TenantScope::new("org-1", "br-1")
    }

    fn request(order_id: &str) -> CreateDeliveryRequest {
        CreateDeliveryRequest {
            order_id: order_id.to_string(),
            recipient_name: Some("Asha Rao".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_accepts_and_persists() {
        let f = fixture();

        let order = f.service.create(&scope(), request("O-1")).await.unwrap();

        assert_eq!(order.status, DeliveryStatus::Accepted);
        assert_eq!(order.partner_tracking_id.as_deref(), Some("AWB-123"));
        let stored = f.store.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let f = fixture();

        f.service.create(&scope(), request("O-1")).await.unwrap();
        let err = f.service.create(&scope(), request("O-1")).await.unwrap_err();

        assert!(matches!(err, DeliveryError::DuplicateRequest(_)));
        assert_eq!(f.store.len().await, 1);
        assert_eq!(f.partner.create_calls(), 1);

        // same order id in another branch is a different delivery
        let other = TenantScope::new("org-1", "br-2");
        assert!(f.service.create(&other, request("O-1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_partner_failure_leaves_no_record() {
        let f = fixture_with(
            MockPartnerStrategy::new().failing_create(PartnerApiError::new("SHIPROCKET", 422, "Invalid pincode")),
        );

        let err = f.service.create(&scope(), request("O-1")).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Partner(ref e) if e.status == Some(422)));
        assert!(f.store.is_empty().await);
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_preferred_partner_is_configuration_error() {
        let f = fixture();
        let mut req = request("O-1");
        req.preferred_partner = Some("DUNZO".to_string());

        let err = f.service.create(&scope(), req).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Configuration(_)));
        assert_eq!(f.partner.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_partner_call() {
        let f = fixture();
        let mut req = request("O-1");
        req.recipient_phone = Some("not-a-phone!".to_string());

        let err = f.service.create(&scope(), req).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Validation(_)));
        assert_eq!(f.partner.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_foreign_organization_is_denied_not_missing() {
        let f = fixture();
        let order = f.service.create(&scope(), request("O-1")).await.unwrap();
        let intruder = TenantScope::new("org-2", "br-1");

        let err = f.service.get_by_id(&intruder, order.id).await.unwrap_err();
        assert!(matches!(err, DeliveryError::AccessDenied(_)));

        let err = f.service.cancel(&intruder, order.id, "not mine to cancel").await.unwrap_err();
        assert!(matches!(err, DeliveryError::AccessDenied(_)));
        assert_eq!(f.partner.cancel_calls(), 0);

        let err = f.service.get_by_id(&scope(), Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_status_within_branch() {
        let f = fixture();
        let first = f.service.create(&scope(), request("O-1")).await.unwrap();
        f.service.create(&scope(), request("O-2")).await.unwrap();
        f.service.create(&TenantScope::new("org-1", "br-2"), request("O-3")).await.unwrap();
        f.service.cancel(&scope(), first.id, "Customer changed mind").await.unwrap();

        assert_eq!(f.service.list(&scope(), None).await.unwrap().len(), 2);
        let cancelled = f.service.list(&scope(), Some(DeliveryStatus::Cancelled)).await.unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, first.id);
    }

    #[tokio::test]
    async fn test_cancel_records_reason() {
        let f = fixture();
        let order = f.service.create(&scope(), request("O-1")).await.unwrap();

        let cancelled = f.service.cancel(&scope(), order.id, "Customer changed mind").await.unwrap();

        assert_eq!(cancelled.status, DeliveryStatus::Cancelled);
        assert_eq!(cancelled.notes.as_deref(), Some("Cancelled by user. Reason: Customer changed mind"));
        assert_eq!(f.partner.cancel_calls(), 1);

        let err = f.service.cancel(&scope(), order.id, "Second attempt").await.unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_partner_cancel_failure_still_cancels_locally() {
        let f = fixture_with(
            MockPartnerStrategy::new().failing_cancel(PartnerApiError::new("SHIPROCKET", 400, "Already picked up")),
        );
        let order = f.service.create(&scope(), request("O-1")).await.unwrap();

        let cancelled = f.service.cancel(&scope(), order.id, "Customer changed mind").await.unwrap();

        assert_eq!(cancelled.status, DeliveryStatus::Cancelled);
        let notes = cancelled.notes.unwrap();
        assert!(notes.contains("Partner cancellation failed"));
        assert!(notes.ends_with("Cancelled by user. Reason: Customer changed mind"));
    }

    /// Applies a partner status to the stored record just before the first conditional write.
    struct WebhookLandsFirst {
        inner: Arc<InMemoryDeliveryStore>,
        status: DeliveryStatus,
        fired: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl DeliveryStore for WebhookLandsFirst {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryOrder>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_order_id(&self, scope: &TenantScope, order_id: &str) -> Result<Option<DeliveryOrder>, StoreError> {
            self.inner.find_by_order_id(scope, order_id).await
        }

        async fn find_by_scope(&self, scope: &TenantScope) -> Result<Vec<DeliveryOrder>, StoreError> {
            self.inner.find_by_scope(scope).await
        }

        async fn find_by_scope_and_status(
            &self,
            scope: &TenantScope,
            status: DeliveryStatus,
        ) -> Result<Vec<DeliveryOrder>, StoreError> {
            self.inner.find_by_scope_and_status(scope, status).await
        }

        async fn find_by_tracking_id(&self, tracking_id: &str) -> Result<Option<DeliveryOrder>, StoreError> {
            self.inner.find_by_tracking_id(tracking_id).await
        }

        async fn save(&self, order: &DeliveryOrder) -> Result<(), StoreError> {
            self.inner.save(order).await
        }

        async fn save_if_status(&self, order: &DeliveryOrder, expected: DeliveryStatus) -> Result<bool, StoreError> {
            if !self.fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
                if let Some(mut stored) = self.inner.find_by_id(order.id).await? {
                    stored.apply_status(self.status, chrono::Utc::now());
                    self.inner.save(&stored).await?;
                }
            }
            self.inner.save_if_status(order, expected).await
        }
    }

    fn racing_fixture(status: DeliveryStatus) -> (DeliveryService, Arc<InMemoryDeliveryStore>) {
        let inner = Arc::new(InMemoryDeliveryStore::new());
        let store = Arc::new(WebhookLandsFirst {
            inner: inner.clone(),
            status,
            fired: Default::default(),
        });
        let registry = Arc::new(StrategyRegistry::default().with(Arc::new(MockPartnerStrategy::new())));
        (DeliveryService::new(registry, store, DeliveryPartner::Shiprocket), inner)
    }

    #[tokio::test]
    async fn test_cancel_does_not_overwrite_concurrent_delivery() {
        let (service, store) = racing_fixture(DeliveryStatus::Delivered);
        let order = service.create(&scope(), request("O-1")).await.unwrap();

        let err = service.cancel(&scope(), order.id, "Customer changed mind").await.unwrap_err();

        assert!(matches!(
            err,
            DeliveryError::InvalidTransition { from: DeliveryStatus::Delivered, to: DeliveryStatus::Cancelled }
        ));
        let stored = store.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Delivered);
        assert!(stored.delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_retries_after_concurrent_progress() {
        let (service, store) = racing_fixture(DeliveryStatus::InTransit);
        let order = service.create(&scope(), request("O-1")).await.unwrap();

        let cancelled = service.cancel(&scope(), order.id, "Customer changed mind").await.unwrap();

        assert_eq!(cancelled.status, DeliveryStatus::Cancelled);
        assert_eq!(cancelled.notes.as_deref(), Some("Cancelled by user. Reason: Customer changed mind"));
        assert_eq!(
            store.find_by_id(order.id).await.unwrap().unwrap().status,
            DeliveryStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_reason_length() {
        let f = fixture();
        let order = f.service.create(&scope(), request("O-1")).await.unwrap();

        let err = f.service.cancel(&scope(), order.id, "no").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_track_reports_live_status_without_writing() {
        let f = fixture_with(MockPartnerStrategy::new().with_live_status(DeliveryStatus::InTransit));
        let order = f.service.create(&scope(), request("O-1")).await.unwrap();
        let writes = f.store.write_count();

        let snapshot = f.service.track(&scope(), order.id).await.unwrap();

        assert_eq!(snapshot.stored_status, DeliveryStatus::Accepted);
        assert_eq!(snapshot.live_status, DeliveryStatus::InTransit);
        assert_eq!(f.store.write_count(), writes);
    }
}
