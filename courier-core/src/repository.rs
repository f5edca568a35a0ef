use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{DeliveryOrder, DeliveryStatus, TenantScope};

/// Persistence for delivery orders. Implementations only guarantee per-record atomicity.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Fetch by primary id regardless of tenant; ownership is checked by the caller.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryOrder>, StoreError>;

    async fn find_by_order_id(
        &self,
        scope: &TenantScope,
        order_id: &str,
    ) -> Result<Option<DeliveryOrder>, StoreError>;

    async fn find_by_scope(&self, scope: &TenantScope) -> Result<Vec<DeliveryOrder>, StoreError>;

    async fn find_by_scope_and_status(
        &self,
        scope: &TenantScope,
        status: DeliveryStatus,
    ) -> Result<Vec<DeliveryOrder>, StoreError>;

    async fn find_by_tracking_id(&self, tracking_id: &str) -> Result<Option<DeliveryOrder>, StoreError>;

    /// Insert or replace the record with `order.id`.
    async fn save(&self, order: &DeliveryOrder) -> Result<(), StoreError>;

    /// Replace the record only while its stored status is still `expected`.
    /// `Ok(false)` means another writer changed it first and nothing was written.
    async fn save_if_status(&self, order: &DeliveryOrder, expected: DeliveryStatus) -> Result<bool, StoreError>;
}
