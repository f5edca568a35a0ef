use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use courier_core::PartnerApiError;
use courier_shared::Masked;
use tokio::sync::{Mutex, RwLock};

/// Bearer credential issued by a partner's login endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    value: Masked<String>,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: Masked::new(value.into()),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        self.value.expose()
    }

    /// Usable at `now` only while it is more than `margin` away from expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// Shared, refresh-deduplicating holder for one partner's auth token.
///
/// Readers take the fast path through the `RwLock`. Only one caller at a
/// time may run the refresh; everyone queued behind it re-checks the state
/// after acquiring the gate and reuses the token it produced.
pub struct TokenCache {
    current: RwLock<Option<Arc<AuthToken>>>,
    refresh_gate: Mutex<()>,
    ttl: Duration,
    margin: Duration,
}

impl TokenCache {
    pub fn new(ttl: Duration, margin: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            ttl,
            margin,
        }
    }

    pub async fn valid_token(&self, now: DateTime<Utc>) -> Option<Arc<AuthToken>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_valid_at(now, self.margin))
            .cloned()
    }

    /// Return the cached token, or run `refresh` to obtain a new one.
    /// `refresh` yields the raw token string; expiry is stamped here.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Arc<AuthToken>, PartnerApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, PartnerApiError>>,
    {
        if let Some(token) = self.valid_token(Utc::now()).await {
            return Ok(token);
        }

        let _gate = self.refresh_gate.lock().await;

        if let Some(token) = self.valid_token(Utc::now()).await {
            tracing::debug!("Auth token refreshed by a concurrent caller, reusing it");
            return Ok(token);
        }

        let value = refresh().await?;
        let token = Arc::new(AuthToken::new(value, Utc::now() + self.ttl));
        *self.current.write().await = Some(Arc::clone(&token));
        tracing::info!(expires_at = %token.expires_at, "Partner auth token refreshed");

        Ok(token)
    }

    pub async fn store(&self, token: AuthToken) {
        *self.current.write().await = Some(Arc::new(token));
    }

    /// Drop the cached token if it is still the one the partner rejected.
    /// A token already replaced by a concurrent refresh is left alone.
    pub async fn invalidate(&self, rejected: &AuthToken) {
        let mut current = self.current.write().await;
        if current.as_deref().is_some_and(|token| token.value() == rejected.value()) {
            *current = None;
            tracing::warn!("Partner rejected auth token, cache cleared");
        }
    }

    pub async fn clear(&self) {
        *self.current.write().await = None;
    }
}
