mod batch;
mod cache;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod parsing;
mod routes;
mod scoring;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::batch::BatchOrchestrator;
use crate::cache::store::{CacheStore, FsCacheStore, RedisCacheStore};
use crate::cache::ExtractionCache;
use crate::config::{CacheBackend, Config, ScorerKind};
use crate::extraction::ocr::TesseractOcr;
use crate::extraction::TextExtractor;
use crate::llm_client::{CompletionService, LlmClient};
use crate::parsing::StructuredParser;
use crate::routes::build_router;
use crate::scoring::{FitScorer, LlmFitScorer, WeightedFitScorer};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screener v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.llm_settings());
    info!("LLM client initialized (model: {})", llm.model());
    let service: Arc<dyn CompletionService> = Arc::new(llm);

    // Initialize extraction cache
    let store: Arc<dyn CacheStore> = match &config.cache_backend {
        CacheBackend::Fs { dir } => {
            let store = FsCacheStore::open(dir)
                .await
                .with_context(|| format!("opening cache directory {}", dir.display()))?;
            info!("Extraction cache persisted under {}", dir.display());
            Arc::new(store)
        }
        CacheBackend::Redis { url } => {
            let store = RedisCacheStore::connect(url)
                .await
                .context("connecting to Redis cache")?;
            info!("Extraction cache persisted in Redis");
            Arc::new(store)
        }
    };
    let cache = Arc::new(ExtractionCache::new(store));

    let extractor = TextExtractor::new(Arc::new(TesseractOcr::new(
        config.ocr_dpi,
        config.ocr_language.clone(),
    )));

    // Weighted by default; the LLM scorer is opt-in via FIT_SCORER=llm
    let scorer: Arc<dyn FitScorer> = match config.fit_scorer {
        ScorerKind::Weighted => Arc::new(WeightedFitScorer),
        ScorerKind::Llm => Arc::new(LlmFitScorer::new(service.clone())),
    };
    info!("Fit scorer: {:?}", config.fit_scorer);

    let batch_config = config.batch_config();
    info!(
        "Batch pool: {} workers, {:?} per document",
        batch_config.workers, batch_config.document_timeout
    );
    let orchestrator = BatchOrchestrator::new(
        extractor,
        cache.clone(),
        StructuredParser::new(service, config.parse_retry),
        scorer,
        batch_config,
    );

    let state = AppState::new(orchestrator, config.clone());

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS once the UI origin is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = cache.flush().await {
        warn!("Failed to flush extraction cache: {e}");
    }
    info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
