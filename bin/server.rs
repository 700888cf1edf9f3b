// Provenance Graph - Web Server
// Read API over the classified document graph (axum)

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use provenance_graph::{
    build_router, get_all_documents, setup_database, AppState, EngineConfig, NoSimilarity, SnapshotStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("🔗 Provenance Graph Server v{}", provenance_graph::VERSION);

    // Optional config path as first argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EngineConfig::load(config_path.as_deref())?;

    // Open database
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database: {:?}", config.database_path))?;
    setup_database(&conn)?;
    info!("✓ Database opened: {:?}", config.database_path);

    // Build the first snapshot before accepting requests
    let documents = get_all_documents(&conn)?;
    let store = Arc::new(SnapshotStore::from_config(&config, Arc::new(NoSimilarity))?);
    let builder = Arc::clone(&store);
    let snapshot = tokio::task::spawn_blocking(move || builder.rebuild(&documents))
        .await
        .context("Snapshot build task failed")?;
    info!(
        "✓ Snapshot ready: {} documents, {} addresses, {} edges",
        snapshot.documents().len(),
        snapshot.index().len(),
        snapshot.edges().len()
    );

    let bind_address = config.bind_address.clone();
    let app = build_router(AppState::new(store, config));

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;

    info!("🚀 Server running on http://{}", bind_address);
    info!("   API: http://{}/api/blockchain/addresses", bind_address);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
