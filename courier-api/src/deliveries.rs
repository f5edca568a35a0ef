use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use courier_core::{CreateDeliveryRequest, DeliveryOrder, DeliveryPartner, DeliveryStatus, TenantScope};
use courier_delivery::TrackingSnapshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::tenant_middleware;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub order_id: String,
    pub organization_id: String,
    pub branch_id: String,
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

impl From<DeliveryOrder> for DeliveryResponse {
    fn from(order: DeliveryOrder) -> Self {
        Self {
            id: order.id,
            order_id: order.order_id,
            organization_id: order.organization_id,
            branch_id: order.branch_id,
            partner_name: order.partner_name,
            partner_tracking_id: order.partner_tracking_id,
            partner_shipment_id: order.partner_shipment_id,
            status: order.status,
            pickup_address: order.pickup_address,
            dropoff_address: order.dropoff_address,
            recipient_name: order.recipient_name,
            recipient_phone: order.recipient_phone,
            delivery_fee: order.delivery_fee,
            notes: order.notes,
            created_at: order.created_at,
            updated_at: order.updated_at,
            delivered_at: order.delivered_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/deliveries", post(create_delivery).get(list_deliveries))
        .route("/api/v1/deliveries/{id}", get(get_delivery))
        .route("/api/v1/deliveries/{id}/track", get(track_delivery))
        .route("/api/v1/deliveries/{id}/cancel", post(cancel_delivery))
        .route_layer(axum::middleware::from_fn(tenant_middleware))
}

/// POST /api/v1/deliveries
async fn create_delivery(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Json(request): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<DeliveryResponse>), AppError> {
    let order = state.deliveries.create(&scope, request).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /api/v1/deliveries?status=
async fn list_deliveries(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<DeliveryResponse>>, AppError> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<DeliveryStatus>())
        .transpose()?;

    let orders = state.deliveries.list(&scope, status).await?;
    Ok(Json(orders.into_iter().map(DeliveryResponse::from).collect()))
}

/// GET /api/v1/deliveries/{id}
async fn get_delivery(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let order = state.deliveries.get_by_id(&scope, id).await?;
    Ok(Json(order.into()))
}

/// GET /api/v1/deliveries/{id}/track
async fn track_delivery(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingSnapshot>, AppError> {
    Ok(Json(state.deliveries.track(&scope, id).await?))
}

/// POST /api/v1/deliveries/{id}/cancel
async fn cancel_delivery(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let order = state.deliveries.cancel(&scope, id, &request.reason).await?;
    Ok(Json(order.into()))
}
