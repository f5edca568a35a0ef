use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_core::DeliveryError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    Delivery(DeliveryError),
    Anyhow(anyhow::Error),
}

impl AppError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Delivery(err) => match err {
                DeliveryError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                DeliveryError::AccessDenied(_) => (StatusCode::FORBIDDEN, err.to_string()),
                DeliveryError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                DeliveryError::DuplicateRequest(_) | DeliveryError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, err.to_string())
                }
                DeliveryError::Configuration(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
                DeliveryError::Partner(ref partner) => {
                    tracing::error!(partner = %partner.partner, status = ?partner.status, "Partner call failed: {}", partner.message);
                    (StatusCode::BAD_GATEWAY, err.to_string())
                }
                DeliveryError::Lookup(_) | DeliveryError::Store(_) => {
                    tracing::error!("Internal Server Error: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
                }
            },
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        Self::Delivery(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
