use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use callwatch_core::{CallTracker, TrackerConfig};
use callwatch_server::{
    api::{create_router, ApiState},
    config::ServerConfig,
    provider::HttpTelephonyProvider,
    webhook::HttpVoiceWebhook,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("callwatch=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(port = config.port, "starting callwatch v{}", env!("CARGO_PKG_VERSION"));

    let provider: Arc<dyn callwatch_server::TelephonyProvider> = Arc::new(HttpTelephonyProvider::new(
        config.provider_base_url.clone(),
        config.provider_account_id.clone(),
        config.provider_auth_token.clone(),
    ));
    let webhook: Arc<dyn callwatch_server::VoiceWebhook> =
        Arc::new(HttpVoiceWebhook::new(config.webhook_base_url.clone()));
    let tracker = CallTracker::new(TrackerConfig::default());

    let app = create_router(ApiState {
        tracker,
        provider,
        webhook,
        config: config.clone(),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
