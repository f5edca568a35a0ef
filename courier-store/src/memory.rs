use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_core::{DeliveryOrder, DeliveryStatus, DeliveryStore, StoreError, TenantScope};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local delivery store. Used when no database is configured and in tests.
///
/// Mirrors the Postgres schema's uniqueness on `(organization_id, branch_id, order_id)`.
#[derive(Default)]
pub struct InMemoryDeliveryStore {
    orders: RwLock<HashMap<Uuid, DeliveryOrder>>,
    writes: AtomicUsize,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

fn newest_first(mut orders: Vec<DeliveryOrder>) -> Vec<DeliveryOrder> {
    orders.sort_by(|a, b| b.id.cmp(&a.id));
    orders
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryOrder>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_order_id(&self, scope: &TenantScope, order_id: &str) -> Result<Option<DeliveryOrder>, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.scope() == *scope && o.order_id == order_id)
            .cloned())
    }

    async fn find_by_scope(&self, scope: &TenantScope) -> Result<Vec<DeliveryOrder>, StoreError> {
        let orders = self.orders.read().await;
        Ok(newest_first(orders.values().filter(|o| o.scope() == *scope).cloned().collect()))
    }

    async fn find_by_scope_and_status(
        &self,
        scope: &TenantScope,
        status: DeliveryStatus,
    ) -> Result<Vec<DeliveryOrder>, StoreError> {
        let orders = self.orders.read().await;
        Ok(newest_first(
            orders
                .values()
                .filter(|o| o.scope() == *scope && o.status == status)
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_tracking_id(&self, tracking_id: &str) -> Result<Option<DeliveryOrder>, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.partner_tracking_id.as_deref() == Some(tracking_id))
            .cloned())
    }

    async fn save(&self, order: &DeliveryOrder) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;

        let clash = orders.values().any(|o| {
            o.id != order.id
                && o.organization_id == order.organization_id
                && o.branch_id == order.branch_id
                && o.order_id == order.order_id
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "delivery for order {} already exists in this branch",
                order.order_id
            )));
        }

        orders.insert(order.id, order.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save_if_status(&self, order: &DeliveryOrder, expected: DeliveryStatus) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            Some(stored) if stored.status == expected => {
                *stored = order.clone();
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
