use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use courier_core::serviceability::{DeliveryOption, ServiceabilityQuery};
use courier_core::DeliveryPartner;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ServiceabilityParams {
    pub partner: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/internal/serviceability", post(check_serviceability))
}

/// POST /api/internal/serviceability
async fn check_serviceability(
    State(state): State<AppState>,
    Query(params): Query<ServiceabilityParams>,
    Json(query): Json<ServiceabilityQuery>,
) -> Result<Json<Vec<DeliveryOption>>, AppError> {
    let partner = params
        .partner
        .as_deref()
        .map(str::parse::<DeliveryPartner>)
        .transpose()?;

    let options = state.deliveries.serviceability(partner, &query).await?;
    tracing::debug!(count = options.len(), "Serviceability options returned");
    Ok(Json(options))
}
