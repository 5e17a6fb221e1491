use std::sync::Arc;

use clap::Parser;
use recall_bus::EventBus;
use recall_query::QueryEngine;
use recall_registry::{RunnerSpawn, SessionRegistry};
use recall_runtime::{HttpGenerator, MemoryAgentRunner, SkipList};
use recall_store::Store;
use recall_vector::{HttpVectorIndex, NullVectorIndex, VectorIndex};
use tracing_subscriber::EnvFilter;

use recall_server::config::Config;
use recall_server::state::AppState;
use recall_server::{router, startup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tokio::fs::create_dir_all(&config.data_dir).await?;

    // A store that can't migrate cleanly must abort process start rather
    // than run in an unknown schema state.
    let store = Store::connect(&config.database_url()).await?;

    let vector: Arc<dyn VectorIndex> = match &config.vector_url {
        Some(url) => Arc::new(HttpVectorIndex::new(url.clone())),
        None => {
            tracing::warn!("RECALL_VECTOR_URL not set, running with FTS-only search");
            Arc::new(NullVectorIndex)
        }
    };

    startup::resync_vector_index(&store, &vector).await;

    let bus = EventBus::new();
    let registry = Arc::new(SessionRegistry::new());
    let generator = Arc::new(HttpGenerator::new(config.generator_url.clone(), config.model.clone()));
    let runner = MemoryAgentRunner::new(store.clone(), vector.clone(), bus.clone(), registry.clone(), generator);
    let runner: Arc<dyn RunnerSpawn> = Arc::new(runner);

    let query = QueryEngine::new(store.clone(), vector.clone());
    let skip_list = SkipList::from_env_value(config.skip_tools.as_deref());

    let state = AppState {
        store: store.clone(),
        vector,
        bus,
        registry: registry.clone(),
        query,
        skip_list,
        runner,
        default_context_limit: config.context_limit,
    };

    let app = router::build(state);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(address = %bind_addr, "recalld listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cancel every live generator task and mark its session failed rather
    // than leaving it silently stuck `active`.
    let interrupted = registry.shutdown_all().await;
    for session_db_id in interrupted {
        if let Err(err) = store.mark_failed(session_db_id).await {
            tracing::warn!(error = %err, session_db_id, "failed to mark interrupted session as failed");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
