use crate::models::DeliveryStatus;

/// Any non-success exchange with a logistics partner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{partner} {detail}: {message}", detail = outcome(.status))]
pub struct PartnerApiError {
    pub partner: String,
    /// HTTP status returned by the partner. `None` when no response arrived (timeout, connect failure).
    pub status: Option<u16>,
    pub message: String,
}

impl PartnerApiError {
    pub fn new(partner: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            partner: partner.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(partner: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            partner: partner.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

fn outcome(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!("API error (HTTP {})", status),
        None => "API unreachable".to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Conflicting delivery record: {0}")]
    Conflict(String),

    #[error("Delivery store failure: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Upstream service returned no record: {0}")]
    NotFound(String),

    #[error("Upstream service call failed: {0}")]
    Upstream(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Partner(#[from] PartnerApiError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Delivery not found: {0}")]
    NotFound(String),

    #[error("Duplicate delivery request: {0}")]
    DuplicateRequest(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DeliveryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => DeliveryError::DuplicateRequest(msg),
            other => DeliveryError::Store(other),
        }
    }
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;
