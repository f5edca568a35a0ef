use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{DeliveryOrder, DeliveryStatus, DeliveryStore, StoreError, TenantScope};
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str = "id, organization_id, branch_id, order_id, partner_name, partner_tracking_id, \
    partner_shipment_id, status, pickup_address, dropoff_address, recipient_name, recipient_phone, \
    delivery_fee, notes, created_at, updated_at, delivered_at";

pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: Uuid,
    organization_id: String,
    branch_id: String,
    order_id: String,
    partner_name: String,
    partner_tracking_id: Option<String>,
    partner_shipment_id: Option<i64>,
    status: String,
    pickup_address: Option<String>,
    dropoff_address: Option<String>,
    recipient_name: Option<String>,
    recipient_phone: Option<String>,
    delivery_fee: Option<f64>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
}

impl TryFrom<DeliveryRow> for DeliveryOrder {
    type Error = StoreError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        let partner_name = row
            .partner_name
            .parse()
            .map_err(|_| StoreError::Backend(format!("Unknown partner '{}' on delivery {}", row.partner_name, row.id)))?;
        let status = row
            .status
            .parse()
            .map_err(|_| StoreError::Backend(format!("Unknown status '{}' on delivery {}", row.status, row.id)))?;

        Ok(DeliveryOrder {
            id: row.id,
            organization_id: row.organization_id,
            branch_id: row.branch_id,
            order_id: row.order_id,
            partner_name,
            partner_tracking_id: row.partner_tracking_id,
            partner_shipment_id: row.partner_shipment_id,
            status,
            pickup_address: row.pickup_address,
            dropoff_address: row.dropoff_address,
            recipient_name: row.recipient_name,
            recipient_phone: row.recipient_phone,
            delivery_fee: row.delivery_fee,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            delivered_at: row.delivered_at,
        })
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(db.message().to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn into_orders(rows: Vec<DeliveryRow>) -> Result<Vec<DeliveryOrder>, StoreError> {
    rows.into_iter().map(DeliveryOrder::try_from).collect()
}

#[async_trait]
impl DeliveryStore for PgDeliveryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryOrder>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM delivery_orders WHERE id = $1");
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(DeliveryOrder::try_from).transpose()
    }

    async fn find_by_order_id(&self, scope: &TenantScope, order_id: &str) -> Result<Option<DeliveryOrder>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM delivery_orders WHERE organization_id = $1 AND branch_id = $2 AND order_id = $3"
        );
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(&scope.organization_id)
            .bind(&scope.branch_id)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(DeliveryOrder::try_from).transpose()
    }

    async fn find_by_scope(&self, scope: &TenantScope) -> Result<Vec<DeliveryOrder>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM delivery_orders WHERE organization_id = $1 AND branch_id = $2 ORDER BY id DESC"
        );
        let rows = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(&scope.organization_id)
            .bind(&scope.branch_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        into_orders(rows)
    }

    async fn find_by_scope_and_status(
        &self,
        scope: &TenantScope,
        status: DeliveryStatus,
    ) -> Result<Vec<DeliveryOrder>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM delivery_orders \
             WHERE organization_id = $1 AND branch_id = $2 AND status = $3 ORDER BY id DESC"
        );
        let rows = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(&scope.organization_id)
            .bind(&scope.branch_id)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        into_orders(rows)
    }

    async fn find_by_tracking_id(&self, tracking_id: &str) -> Result<Option<DeliveryOrder>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM delivery_orders WHERE partner_tracking_id = $1 LIMIT 1");
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(tracking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(DeliveryOrder::try_from).transpose()
    }

    async fn save(&self, order: &DeliveryOrder) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO delivery_orders (
                id, organization_id, branch_id, order_id, partner_name, partner_tracking_id,
                partner_shipment_id, status, pickup_address, dropoff_address, recipient_name,
                recipient_phone, delivery_fee, notes, created_at, updated_at, delivered_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                partner_tracking_id = EXCLUDED.partner_tracking_id,
                partner_shipment_id = EXCLUDED.partner_shipment_id,
                status = EXCLUDED.status,
                pickup_address = EXCLUDED.pickup_address,
                dropoff_address = EXCLUDED.dropoff_address,
                recipient_name = EXCLUDED.recipient_name,
                recipient_phone = EXCLUDED.recipient_phone,
                delivery_fee = EXCLUDED.delivery_fee,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at,
                delivered_at = EXCLUDED.delivered_at
            "#,
        )
        .bind(order.id)
        .bind(&order.organization_id)
        .bind(&order.branch_id)
        .bind(&order.order_id)
        .bind(order.partner_name.as_str())
        .bind(&order.partner_tracking_id)
        .bind(order.partner_shipment_id)
        .bind(order.status.as_str())
        .bind(&order.pickup_address)
        .bind(&order.dropoff_address)
        .bind(&order.recipient_name)
        .bind(&order.recipient_phone)
        .bind(order.delivery_fee)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.delivered_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        tracing::debug!(delivery_id = %order.id, status = %order.status, "Delivery saved");
        Ok(())
    }

    async fn save_if_status(&self, order: &DeliveryOrder, expected: DeliveryStatus) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE delivery_orders SET
                partner_tracking_id = $2,
                partner_shipment_id = $3,
                status = $4,
                notes = $5,
                updated_at = $6,
                delivered_at = $7
            WHERE id = $1 AND status = $8
            "#,
        )
        .bind(order.id)
        .bind(&order.partner_tracking_id)
        .bind(order.partner_shipment_id)
        .bind(order.status.as_str())
        .bind(&order.notes)
        .bind(order.updated_at)
        .bind(order.delivered_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        let applied = result.rows_affected() == 1;
        tracing::debug!(delivery_id = %order.id, expected = %expected, status = %order.status, applied, "Conditional delivery update");
        Ok(applied)
    }
}
