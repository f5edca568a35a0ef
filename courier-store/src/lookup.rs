use std::time::Duration;

use async_trait::async_trait;
use courier_core::lookup::{BranchConfig, BranchConfigLookup, OrderDetails, OrderLookup};
use courier_core::{LookupError, TenantScope};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

fn http_client(timeout: Duration) -> Result<reqwest::Client, LookupError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LookupError::Upstream(format!("Failed to build HTTP client: {}", e)))
}

fn parse_base_url(raw: String) -> Result<Url, LookupError> {
    let url = Url::parse(&raw).map_err(|e| LookupError::Upstream(format!("Invalid service URL {}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(LookupError::Upstream(format!("Invalid service URL {}", raw)));
    }
    Ok(url)
}

/// Append each segment percent-encoded, so caller-supplied ids stay inside their segment.
/// Empty and dot segments are refused since they would address a different resource.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, LookupError> {
    if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
        return Err(LookupError::Upstream(format!("Refusing path segment {:?}", bad)));
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| LookupError::Upstream(format!("Invalid service URL {}", base)))?
        .pop_if_empty()
        .extend(segments.iter().copied());
    Ok(url)
}

/// GET a JSON document. 404 is "no record", anything else non-2xx is an upstream failure.
async fn fetch<T: DeserializeOwned>(client: &reqwest::Client, url: Url) -> Result<Option<T>, LookupError> {
    debug!(url = %url, "Fetching from sibling service");
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| LookupError::Upstream(format!("GET {} failed: {}", url, e)))?;

    match response.status() {
        StatusCode::NOT_FOUND => Ok(None),
        status if status.is_success() => response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| LookupError::Upstream(format!("GET {} returned an unreadable body: {}", url, e))),
        status => {
            warn!(url = %url, status = status.as_u16(), "Sibling service call failed");
            Err(LookupError::Upstream(format!("GET {} returned HTTP {}", url, status.as_u16())))
        }
    }
}

/// Reads enriched orders from the order service.
pub struct HttpOrderLookup {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpOrderLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: parse_base_url(base_url.into())?,
        })
    }
}

#[async_trait]
impl OrderLookup for HttpOrderLookup {
    async fn order_details(&self, organization_id: &str, order_id: &str) -> Result<Option<OrderDetails>, LookupError> {
        let url = endpoint(&self.base_url, &["api", "internal", organization_id, "orders", order_id])?;
        fetch(&self.client, url).await
    }
}

/// Reads branch pickup configuration from the organization service.
pub struct HttpBranchConfigLookup {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBranchConfigLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: parse_base_url(base_url.into())?,
        })
    }
}

#[async_trait]
impl BranchConfigLookup for HttpBranchConfigLookup {
    async fn branch_config(&self, scope: &TenantScope) -> Result<Option<BranchConfig>, LookupError> {
        let url = endpoint(
            &self.base_url,
            &[
                "api",
                "v1",
                "internal",
                "organizations",
                &scope.organization_id,
                "branches",
                &scope.branch_id,
                "config",
            ],
        )?;
        fetch(&self.client, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn spawn_services() -> String {
        let app = Router::new()
            .route(
                "/api/internal/{org}/orders/{order}",
                get(|Path((org, order)): Path<(String, String)>| async move {
                    match (org.as_str(), order.as_str()) {
                        ("org-1", "O-1") => (
                            AxumStatus::OK,
                            Json(json!({ "orderId": "O-1", "billingCity": "Bengaluru", "items": [] })),
                        ),
                        ("org-1", "O-500") => (AxumStatus::INTERNAL_SERVER_ERROR, Json(json!({}))),
                        ("org-2", "O-9") => (
                            AxumStatus::OK,
                            Json(json!({ "orderId": "O-9", "billingCity": "Mumbai", "items": [] })),
                        ),
                        _ => (AxumStatus::NOT_FOUND, Json(json!({}))),
                    }
                }),
            )
            .route(
                "/api/v1/internal/organizations/{org}/branches/{branch}/config",
                get(|Path((org, branch)): Path<(String, String)>| async move {
                    Json(json!({ "branchId": branch, "shiprocketPickupLocation": format!("{}:Koramangala", org) }))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_order_lookup() {
        let base = spawn_services().await;
        let lookup = HttpOrderLookup::new(format!("{}/", base), Duration::from_secs(2)).unwrap();

        let details = lookup.order_details("org-1", "O-1").await.unwrap().unwrap();
        assert_eq!(details.billing_city.as_deref(), Some("Bengaluru"));

        assert!(lookup.order_details("org-1", "O-404").await.unwrap().is_none());
        assert!(matches!(
            lookup.order_details("org-1", "O-500").await,
            Err(LookupError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_branch_config_lookup() {
        let base = spawn_services().await;
        let lookup = HttpBranchConfigLookup::new(base, Duration::from_secs(2)).unwrap();

        let config = lookup
            .branch_config(&TenantScope::new("org-1", "br-7"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.branch_id.as_deref(), Some("br-7"));
        assert_eq!(config.shiprocket_pickup_location.as_deref(), Some("org-1:Koramangala"));

        let config = lookup
            .branch_config(&TenantScope::new("org-1", "../../org-2/branches/br-7"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.branch_id.as_deref(), Some("../../org-2/branches/br-7"));
        assert_eq!(config.shiprocket_pickup_location.as_deref(), Some("org-1:Koramangala"));
    }

    #[tokio::test]
    async fn test_order_id_cannot_escape_organization() {
        let base = spawn_services().await;
        let lookup = HttpOrderLookup::new(base, Duration::from_secs(2)).unwrap();

        assert!(lookup.order_details("org-2", "O-9").await.unwrap().is_some());

        // dot segments and slashes are encoded, so this stays an org-1 lookup
        assert!(lookup
            .order_details("org-1", "../../org-2/orders/O-9")
            .await
            .unwrap()
            .is_none());
        assert!(lookup.order_details("org-1", "%2E%2E").await.unwrap().is_none());
        assert!(matches!(
            lookup.order_details("org-1", "..").await,
            Err(LookupError::Upstream(_))
        ));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let base = Url::parse("http://orders.local/root/").unwrap();
        let url = endpoint(&base, &["api", "internal", "org-1", "orders", "../x?y#z"]).unwrap();
        assert_eq!(url.as_str(), "http://orders.local/root/api/internal/org-1/orders/..%2Fx%3Fy%23z");

        assert!(matches!(
            HttpOrderLookup::new("not a url", Duration::from_secs(1)),
            Err(LookupError::Upstream(_))
        ));
    }
}
