use std::sync::Arc;
use std::time::Duration;

use courier_core::serviceability::{DeliveryOption, ServiceabilityQuery};
use courier_core::PartnerApiError;
use courier_shared::Masked;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::dto::{
    AssignAwbRequest, AssignAwbResponse, AuthRequest, AuthResponse, CancelOrderRequest, CourierCompany,
    CreateOrderRequest, CreateOrderResponse, ServiceabilityResponse, TrackingResponse,
};
use crate::token::{AuthToken, TokenCache};
use crate::SHIPROCKET;

const DEFAULT_CURRENCY: &str = "INR";

/// Connection settings for the Shiprocket API.
#[derive(Debug, Clone)]
pub struct ShiprocketSettings {
    /// e.g. `https://apiv2.shiprocket.in/v1/external`
    pub base_url: String,
    pub email: String,
    pub password: Masked<String>,
    pub token_ttl: chrono::Duration,
    pub refresh_margin: chrono::Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Whole-request deadline; also bounds the time spent writing the body.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ShiprocketSettings {
    fn default() -> Self {
        Self {
            base_url: "https://apiv2.shiprocket.in/v1/external".to_string(),
            email: String::new(),
            password: Masked::default(),
            token_ttl: chrono::Duration::minutes(60),
            refresh_margin: chrono::Duration::minutes(5),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            user_agent: concat!("courier-api/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Authenticated HTTP client for Shiprocket.
///
/// Every call goes through the shared [`TokenCache`]. A 401 from any
/// endpoint clears the cached token so the next call logs in again.
pub struct ShiprocketClient {
    http: reqwest::Client,
    settings: ShiprocketSettings,
    tokens: Arc<TokenCache>,
}

impl ShiprocketClient {
    pub fn new(settings: ShiprocketSettings) -> Result<Self, PartnerApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| PartnerApiError::transport(SHIPROCKET, format!("Failed to build HTTP client: {}", e)))?;

        let tokens = Arc::new(TokenCache::new(settings.token_ttl, settings.refresh_margin));

        Ok(Self { http, settings, tokens })
    }

    pub fn token_cache(&self) -> Arc<TokenCache> {
        Arc::clone(&self.tokens)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// `path` plus one percent-encoded trailing segment.
    fn url_with_segment(&self, path: &str, segment: &str) -> Result<Url, PartnerApiError> {
        if matches!(segment, "" | "." | "..") {
            return Err(PartnerApiError::transport(SHIPROCKET, format!("Invalid path segment {:?}", segment)));
        }

        let mut url = Url::parse(&self.url(path))
            .map_err(|e| PartnerApiError::transport(SHIPROCKET, format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PartnerApiError::transport(SHIPROCKET, "Invalid base URL"))?
            .push(segment);
        Ok(url)
    }

    /// Cached token, logging in first when absent or inside the refresh margin.
    pub async fn auth_token(&self) -> Result<Arc<AuthToken>, PartnerApiError> {
        self.tokens.get_or_refresh(|| self.login()).await
    }

    async fn login(&self) -> Result<String, PartnerApiError> {
        info!(email = %self.settings.email, "Authenticating with Shiprocket");
        let body = AuthRequest {
            email: &self.settings.email,
            password: self.settings.password.expose(),
        };

        let response = self
            .http
            .post(self.url("auth/login"))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("auth/login", e))?;
        let response = self.check_status("auth/login", response, None).await?;
        let status = response.status().as_u16();

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| PartnerApiError::new(SHIPROCKET, status, format!("Unreadable auth response: {}", e)))?;

        match auth.token.filter(|t| !t.trim().is_empty()) {
            Some(token) => Ok(token),
            None => {
                error!("Shiprocket authentication returned an empty token");
                Err(PartnerApiError::new(SHIPROCKET, status, "Received empty token from Shiprocket"))
            }
        }
    }

    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreateOrderResponse, PartnerApiError> {
        info!(order_id = %request.order_id, "Creating Shiprocket order");
        let url = self.url("orders/create/adhoc");
        let response: CreateOrderResponse = self
            .send_authorized("orders/create/adhoc", |token| {
                self.http.post(url.as_str()).bearer_auth(token).json(request)
            })
            .await?;
        info!(
            order_id = %request.order_id,
            shipment_id = ?response.shipment_id,
            awb = ?response.awb(),
            "Shiprocket order created"
        );
        Ok(response)
    }

    pub async fn assign_awb(&self, shipment_id: i64) -> Result<AssignAwbResponse, PartnerApiError> {
        info!(shipment_id, "Requesting AWB assignment");
        let url = self.url("courier/assign/awb");
        let body = AssignAwbRequest {
            shipment_id,
            courier_id: None,
        };
        self.send_authorized("courier/assign/awb", |token| {
            self.http.post(url.as_str()).bearer_auth(token).json(&body)
        })
        .await
    }

    pub async fn cancel_order(&self, awb: &str) -> Result<(), PartnerApiError> {
        info!(awb = %awb, "Cancelling Shiprocket shipment");
        let url = self.url("orders/cancel");
        let body = CancelOrderRequest { awb_codes: vec![awb] };
        self.execute("orders/cancel", |token| {
            self.http.post(url.as_str()).bearer_auth(token).json(&body)
        })
        .await?;
        Ok(())
    }

    /// Raw Shiprocket status for an AWB. `None` when the partner reports none.
    pub async fn track_order(&self, awb: &str) -> Result<Option<String>, PartnerApiError> {
        debug!(awb = %awb, "Tracking Shiprocket shipment");
        let url = self.url_with_segment("courier/track", awb)?;
        let response: TrackingResponse = self
            .send_authorized("courier/track", |token| self.http.get(url).bearer_auth(token))
            .await?;
        Ok(response.shipment_status().map(str::to_string))
    }

    /// Available couriers for a route. Never fails: any partner error is
    /// logged and yields an empty list.
    pub async fn check_serviceability(&self, query: &ServiceabilityQuery) -> Vec<DeliveryOption> {
        let url = self.url("courier/serviceability");
        let result: Result<ServiceabilityResponse, PartnerApiError> = self
            .send_authorized("courier/serviceability", |token| {
                self.http.get(url.as_str()).bearer_auth(token).query(query)
            })
            .await;

        match result {
            Ok(response) => response
                .data
                .map(|d| d.available_courier_companies)
                .unwrap_or_default()
                .iter()
                .map(to_delivery_option)
                .collect(),
            Err(e) => {
                warn!(error = %e, "Serviceability check failed, returning no options");
                Vec::new()
            }
        }
    }

    async fn send_authorized<T, F>(&self, operation: &'static str, build: F) -> Result<T, PartnerApiError>
    where
        T: DeserializeOwned,
        F: FnOnce(&str) -> RequestBuilder,
    {
        let response = self.execute(operation, build).await?;
        let status = response.status().as_u16();

        response
            .json::<T>()
            .await
            .map_err(|e| PartnerApiError::new(SHIPROCKET, status, format!("Unreadable {} response: {}", operation, e)))
    }

    /// Attach the bearer token, send, and reject non-2xx responses.
    async fn execute<F>(&self, operation: &'static str, build: F) -> Result<Response, PartnerApiError>
    where
        F: FnOnce(&str) -> RequestBuilder,
    {
        let token = self.auth_token().await?;
        debug!(operation, "Sending Shiprocket request");

        let response = build(token.value())
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;
        self.check_status(operation, response, Some(&token)).await
    }

    async fn check_status(
        &self,
        operation: &'static str,
        response: Response,
        token: Option<&AuthToken>,
    ) -> Result<Response, PartnerApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);

        if status == reqwest::StatusCode::UNAUTHORIZED {
            if let Some(token) = token {
                self.tokens.invalidate(token).await;
            }
        }

        error!(operation, status = status.as_u16(), message = %message, "Shiprocket request failed");
        Err(PartnerApiError::new(SHIPROCKET, status.as_u16(), message))
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> PartnerApiError {
    let kind = if err.is_timeout() { "timed out" } else { "failed" };
    error!(operation, error = %err, "Shiprocket request {}", kind);
    PartnerApiError::transport(SHIPROCKET, format!("{} {}: {}", operation, kind, err))
}

/// Prefer a textual `message`, then a structured `errors` object, then the raw body.
pub fn error_message(body: &str) -> String {
    if body.trim().is_empty() {
        return "No error body provided by partner".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
        if let Some(errors) = json.get("errors").filter(|e| e.is_object()) {
            return errors.to_string();
        }
    }

    body.to_string()
}

/// Leading integer of an ETD string: `"3"` -> 3, `"2-3"` -> 2.
pub fn parse_etd_days(etd: &str) -> Option<u32> {
    let digits: String = etd.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn to_delivery_option(courier: &CourierCompany) -> DeliveryOption {
    let courier_id = courier
        .courier_company_id
        .or(courier.id)
        .map(|id| id.to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    let etd_raw = courier
        .estimated_delivery_days
        .clone()
        .or_else(|| courier.etd.clone())
        .filter(|s| !s.trim().is_empty());
    let days = etd_raw.as_deref().and_then(parse_etd_days);

    let service_type = match days {
        Some(n) => format!("{} days delivery", n),
        None => "Standard Delivery".to_string(),
    };
    let description = courier
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| match days {
            Some(n) => format!("Estimated {} days delivery", n),
            None => "Standard Delivery Service".to_string(),
        });

    DeliveryOption {
        courier_id,
        carrier_name: courier.courier_name.clone().unwrap_or_else(|| "Unknown Carrier".to_string()),
        service_type,
        description,
        cost: courier.rate.unwrap_or(0.0),
        currency: DEFAULT_CURRENCY.to_string(),
        estimated_delivery_days: days,
        etd_raw,
        min_weight: courier.min_weight.unwrap_or(0.0),
        max_weight: courier.max_weight.unwrap_or(0.0),
    }
}
