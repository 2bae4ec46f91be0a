use std::sync::Arc;

use agent_hub_server::{
    config::default_log_filter, llm::OpenRouterProvider, router, AppState, Settings,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let settings = Settings::from_env();
    init_tracing(default_log_filter(settings.as_ref()));
    let settings = Arc::new(settings.inspect_err(|e| error!("Invalid configuration: {}", e))?);

    match &settings.openrouter_api_key {
        Some(_) => info!("OpenRouter API key loaded"),
        None => warn!("OPENROUTER_API_KEY not set; chat completions will fail until it is configured"),
    }
    info!(
        "Upstream {} with default model {} ({} environment)",
        settings.openrouter_base_url, settings.default_model, settings.environment
    );

    let provider = Arc::new(OpenRouterProvider::new(settings.clone()));
    let app = router(AppState::new(provider));

    let listener = tokio::net::TcpListener::bind(settings.bind_addr()).await?;
    info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
