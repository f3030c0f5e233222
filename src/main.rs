use anyhow::Context;
use persona_chat::api::{self, app_state::AppState};
use persona_chat::config::loader::ConfigLoader;
use persona_chat::llm::{GeminiClient, TextGenerator};
use persona_chat::observability::{
    AppMetrics, MeteredGenerator, ObservabilityState, create_observability_router, init_tracing,
};
use persona_chat::storage::StorageFactory;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    info!("Starting {} ({})...", config.app_name, config.environment);
    ConfigLoader::validate(&config).context("Invalid configuration")?;
    info!("Configuration loaded successfully");

    let repos = StorageFactory::create(&config.database).await?;
    info!("Storage initialized (backend: {:?})", config.database.backend);

    let metrics = Arc::new(AppMetrics::default());
    let gemini: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(&config.llm)?);
    let oracle: Arc<dyn TextGenerator> = Arc::new(MeteredGenerator::new(gemini, metrics.clone()));
    info!("Text generator initialized: {}", config.llm.model);

    let app_state = AppState::build(&repos, oracle, config.pipeline.clone(), metrics.clone());
    info!(
        "Services initialized (history_limit={}, turn_timeout={}s)",
        config.pipeline.history_limit, config.pipeline.turn_timeout
    );

    let observability_state = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION"),
        metrics,
        repos,
    ));
    let mut router =
        create_observability_router(observability_state).merge(api::create_router(app_state));
    if config.server.request_timeout > 0 {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout,
        )));
    }
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
