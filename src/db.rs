use crate::document::Document;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of one import batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub inserted: usize,
    pub updated: usize,

    /// Same id, same content: skipped
    pub unchanged: usize,
}

/// Hash of the import-owned inputs; detects re-imports of identical documents
/// NOTE: identity is `id`, this hash only answers "did the content change?"
pub fn content_hash(doc: &Document) -> Result<String> {
    let frontmatter = serde_json::to_string(&doc.frontmatter)?;
    let mut hasher = Sha256::new();
    hasher.update(doc.url.as_bytes());
    hasher.update([0u8]);
    hasher.update(doc.content.as_bytes());
    hasher.update([0u8]);
    hasher.update(frontmatter.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Documents Table (raw inputs only; derived fields are never stored)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            content TEXT NOT NULL,
            frontmatter TEXT,
            content_hash TEXT NOT NULL,
            created_at TEXT,
            imported_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_hash ON documents(content_hash)",
        [],
    )?;

    Ok(())
}

/// Read an array of scraped documents; missing ids get a UUID v4
pub fn load_documents_json(json_path: &Path) -> Result<Vec<Document>> {
    let contents = std::fs::read_to_string(json_path)
        .with_context(|| format!("Failed to read documents file: {:?}", json_path))?;

    let documents: Vec<Document> =
        serde_json::from_str(&contents).context("Failed to deserialize documents")?;

    info!("Loaded {} documents from {:?}", documents.len(), json_path);
    Ok(documents)
}

/// Insert or update by id. Importing the same batch twice changes nothing.
pub fn insert_documents(conn: &mut Connection, documents: &[Document]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let now = Utc::now().to_rfc3339();

    let tx = conn.transaction()?;
    for doc in documents {
        let hash = content_hash(doc)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT content_hash FROM documents WHERE id = ?1",
                params![doc.id],
                |row| row.get(0),
            )
            .optional()?;

        if existing.as_deref() == Some(hash.as_str()) {
            stats.unchanged += 1;
            continue;
        }

        let frontmatter_json = serde_json::to_string(&doc.frontmatter)?;
        let created_at = doc.created_at.map(|dt| dt.to_rfc3339());

        tx.execute(
            "INSERT INTO documents (id, url, content, frontmatter, content_hash, created_at, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                url = excluded.url,
                content = excluded.content,
                frontmatter = excluded.frontmatter,
                content_hash = excluded.content_hash,
                created_at = excluded.created_at,
                imported_at = excluded.imported_at",
            params![doc.id, doc.url, doc.content, frontmatter_json, hash, created_at, now],
        )?;

        if existing.is_some() {
            stats.updated += 1;
        } else {
            stats.inserted += 1;
        }
    }
    tx.commit()?;

    info!(
        "Imported documents: {} inserted, {} updated, {} unchanged",
        stats.inserted, stats.updated, stats.unchanged
    );

    Ok(stats)
}

pub fn get_all_documents(conn: &Connection) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT id, url, content, frontmatter, created_at
         FROM documents
         ORDER BY id",
    )?;

    let documents = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let frontmatter_json: Option<String> = row.get(3)?;
            let created_at_str: Option<String> = row.get(4)?;

            let frontmatter = match frontmatter_json {
                Some(json_str) => serde_json::from_str(&json_str).unwrap_or_else(|e| {
                    warn!("Unreadable frontmatter for {}: {}", id, e);
                    BTreeMap::new()
                }),
                None => BTreeMap::new(),
            };

            let created_at = created_at_str
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc));

            Ok(Document {
                id,
                url: row.get(1)?,
                content: row.get(2)?,
                frontmatter,
                created_at,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(documents)
}

/// Remove a document; true when a row was deleted
pub fn delete_document(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

    Ok(count)
}
