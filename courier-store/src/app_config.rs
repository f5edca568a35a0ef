use courier_shared::Masked;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub partner: PartnerConfig,
    pub webhook: WebhookConfig,
    pub services: ServicesConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Unset means deliveries are kept in memory only.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct PartnerConfig {
    pub shiprocket: ShiprocketConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShiprocketConfig {
    pub base_url: String,
    pub email: String,
    pub password: Masked<String>,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_minutes: i64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    pub user_agent: Option<String>,
}

fn default_token_ttl() -> i64 { 60 }
fn default_refresh_margin() -> i64 { 5 }
fn default_connect_timeout() -> u64 { 5 }
fn default_read_timeout() -> u64 { 10 }
fn default_request_timeout() -> u64 { 15 }

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    pub secret: Masked<String>,
    #[serde(default = "default_webhook_header")]
    pub header: String,
}

fn default_webhook_header() -> String { "x-api-key".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub order_url: String,
    pub organization_url: String,
    #[serde(default = "default_service_timeout")]
    pub timeout_seconds: u64,
}

fn default_service_timeout() -> u64 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct DeliveryConfig {
    #[serde(default = "default_partner")]
    pub default_partner: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            default_partner: default_partner(),
        }
    }
}

fn default_partner() -> String { "SHIPROCKET".to_string() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `COURIER_PARTNER__SHIPROCKET__PASSWORD=...`
            .add_source(config::Environment::with_prefix("COURIER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
