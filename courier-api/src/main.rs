use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderName;
use courier_api::{app, AppState};
use courier_core::{DeliveryPartner, DeliveryStore};
use courier_delivery::{DeliveryService, WebhookAuthenticator, WebhookReconciler};
use courier_partner::{PartnerStrategy, ShiprocketClient, ShiprocketSettings, ShiprocketStrategy, StrategyRegistry};
use courier_store::app_config::{Config, ShiprocketConfig};
use courier_store::{DbClient, HttpBranchConfigLookup, HttpOrderLookup, InMemoryDeliveryStore, PgDeliveryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn shiprocket_settings(config: &ShiprocketConfig) -> ShiprocketSettings {
    let defaults = ShiprocketSettings::default();
    ShiprocketSettings {
        base_url: config.base_url.clone(),
        email: config.email.clone(),
        password: config.password.clone(),
        token_ttl: chrono::Duration::minutes(config.token_ttl_minutes),
        refresh_margin: chrono::Duration::minutes(config.refresh_margin_minutes),
        connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
        read_timeout: Duration::from_secs(config.read_timeout_seconds),
        request_timeout: Duration::from_secs(config.request_timeout_seconds),
        user_agent: config.user_agent.clone().unwrap_or(defaults.user_agent),
    }
}

async fn delivery_store(config: &Config) -> anyhow::Result<Arc<dyn DeliveryStore>> {
    match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Ok(Arc::new(PgDeliveryStore::new(db.pool.clone())))
        }
        None => {
            tracing::warn!("No database.url configured; deliveries are kept in memory only");
            Ok(Arc::new(InMemoryDeliveryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_api=debug,courier_partner=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting courier API on port {}", config.server.port);

    let store = delivery_store(&config).await?;

    let services_timeout = Duration::from_secs(config.services.timeout_seconds);
    let orders = Arc::new(HttpOrderLookup::new(config.services.order_url.clone(), services_timeout)?);
    let branches = Arc::new(HttpBranchConfigLookup::new(
        config.services.organization_url.clone(),
        services_timeout,
    )?);

    let shiprocket_client = Arc::new(ShiprocketClient::new(shiprocket_settings(&config.partner.shiprocket))?);
    let strategies: Vec<Arc<dyn PartnerStrategy>> =
        vec![Arc::new(ShiprocketStrategy::new(shiprocket_client, orders, branches))];
    let registry = Arc::new(StrategyRegistry::new(strategies));

    let default_partner: DeliveryPartner = config
        .delivery
        .default_partner
        .parse()
        .context("Invalid delivery.default_partner")?;

    let webhook_header = HeaderName::from_bytes(config.webhook.header.to_ascii_lowercase().as_bytes())
        .context("Invalid webhook.header")?;

    let app_state = AppState {
        deliveries: Arc::new(DeliveryService::new(registry, store.clone(), default_partner)),
        reconciler: Arc::new(WebhookReconciler::new(store)),
        webhook_auth: Arc::new(WebhookAuthenticator::new(config.webhook.secret.clone())),
        webhook_header,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
