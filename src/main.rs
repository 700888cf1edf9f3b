use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use provenance_graph::{
    delete_document, export_edges_csv, export_nodes_csv, get_all_documents, insert_documents,
    load_documents_json, setup_database, verify_count, EngineConfig, NoSimilarity, QueryService,
    SnapshotStore,
};

#[derive(Parser)]
#[command(name = "provenance-graph", about = "Blockchain document classification and relationship graph")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite document store (overrides config)
    #[arg(long, global = true, env = "PROVENANCE_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSON array of scraped documents
    Import {
        /// Documents file
        json: PathBuf,
    },
    /// Classify every stored document and print a summary
    Classify {
        /// Print one document's full classification as JSON
        #[arg(long)]
        document: Option<String>,
    },
    /// Write the relationship graph as CSV
    Export {
        edges: PathBuf,
        nodes: PathBuf,
    },
    /// Delete a stored document
    Remove {
        id: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut engine_config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        engine_config.database_path = db;
    }

    let mut conn = Connection::open(&engine_config.database_path)
        .with_context(|| format!("Failed to open database: {:?}", engine_config.database_path))?;
    setup_database(&conn)?;

    match cli.command {
        Commands::Import { json } => run_import(&mut conn, &json),
        Commands::Classify { document } => run_classify(&conn, &engine_config, document.as_deref()),
        Commands::Export { edges, nodes } => run_export(&conn, &engine_config, &edges, &nodes),
        Commands::Remove { id } => {
            if delete_document(&conn, &id)? {
                println!("✓ Removed {}", id);
            } else {
                println!("No document with id {}", id);
            }
            Ok(())
        }
    }
}

fn run_import(conn: &mut Connection, json: &Path) -> Result<()> {
    println!("📂 Loading documents...");
    let documents = load_documents_json(json)?;
    println!("✓ Loaded {} documents", documents.len());

    println!("\n💾 Inserting documents...");
    let stats = insert_documents(conn, &documents)?;
    println!("✓ Inserted: {}", stats.inserted);
    println!("✓ Updated: {}", stats.updated);
    println!("✓ Unchanged: {}", stats.unchanged);

    let count = verify_count(conn)?;
    println!("\n🔍 Database contains {} documents", count);

    Ok(())
}

fn build_store(conn: &Connection, engine_config: &EngineConfig) -> Result<SnapshotStore> {
    let store = SnapshotStore::from_config(engine_config, Arc::new(NoSimilarity))?;
    let documents = get_all_documents(conn)?;
    store.rebuild(&documents);
    Ok(store)
}

fn run_classify(conn: &Connection, engine_config: &EngineConfig, document: Option<&str>) -> Result<()> {
    let store = build_store(conn, engine_config)?;
    let snapshot = store.current();

    if let Some(id) = document {
        let doc = snapshot
            .document(id)
            .with_context(|| format!("Document not found: {}", id))?;
        println!("{}", serde_json::to_string_pretty(doc)?);
        return Ok(());
    }

    println!("🔗 Provenance Graph v{}", provenance_graph::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Documents:  {}", snapshot.documents().len());
    println!("Patterns:   {}", snapshot.pattern_version());

    let queries = QueryService::new(Arc::clone(&snapshot), engine_config.max_documents_per_address);
    for network in provenance_graph::Network::supported_names() {
        let response = queries.by_network(network)?;
        println!("  {:<10} {}", network, response.count);
    }
    let unknown = snapshot
        .documents()
        .iter()
        .filter(|d| !d.network.is_known())
        .count();
    println!("  {:<10} {}", "unknown", unknown);

    println!("Addresses:  {}", snapshot.index().len());
    println!("Edges:      {}", snapshot.edges().len());
    println!("Digest:     {}", snapshot.digest()?);

    Ok(())
}

fn run_export(conn: &Connection, engine_config: &EngineConfig, edges: &Path, nodes: &Path) -> Result<()> {
    let store = build_store(conn, engine_config)?;
    let snapshot = store.current();

    let edge_count = export_edges_csv(&snapshot, edges)?;
    let node_count = export_nodes_csv(&snapshot, nodes)?;

    println!("✓ Wrote {} edges to {:?}", edge_count, edges);
    println!("✓ Wrote {} nodes to {:?}", node_count, nodes);

    Ok(())
}
