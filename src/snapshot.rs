// 📸 Graph Snapshot - documents + address index + edges, built together
//
// Readers hold an Arc to a finished snapshot and never see a partial rebuild.
// Rebuilds happen off-lock and are swapped in atomically.

use crate::classifier::DocumentClassifier;
use crate::config::EngineConfig;
use crate::document::{ClassifiedDocument, Document};
use crate::index::AddressIndex;
use crate::patterns::PatternLibrary;
use crate::relationships::{RelationshipEdge, RelationshipScorer, SimilarityProvider};
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Default)]
pub struct GraphSnapshot {
    /// Sorted by id
    documents: Vec<ClassifiedDocument>,
    positions: HashMap<String, usize>,
    index: AddressIndex,
    edges: Vec<RelationshipEdge>,
    pattern_version: String,
    pattern_fingerprint: String,

    /// Set when a query finds an index/edge entry whose document is gone
    needs_rebuild: AtomicBool,
}

/// Canonical form hashed by `digest()`
#[derive(Serialize)]
struct DigestView<'a> {
    pattern_fingerprint: &'a str,
    documents: &'a [ClassifiedDocument],
    index: &'a [crate::index::AddressIndexEntry],
    edges: &'a [RelationshipEdge],
}

impl GraphSnapshot {
    pub fn empty() -> Self {
        GraphSnapshot::default()
    }

    /// Classify (parallel) → index (barrier) → score edges (parallel).
    /// Duplicate ids keep the last occurrence.
    pub fn build(
        documents: &[Document],
        patterns: &PatternLibrary,
        scorer: &RelationshipScorer,
        similarity: &dyn SimilarityProvider,
    ) -> Self {
        let unique: BTreeMap<&str, &Document> = documents.iter().map(|d| (d.id.as_str(), d)).collect();
        let ordered: Vec<Document> = unique.into_values().cloned().collect();

        let classified = DocumentClassifier::new(patterns).classify_all(&ordered);
        Self::from_classified(classified, patterns, scorer, similarity)
    }

    /// Assemble from already-classified documents.
    /// Duplicate ids keep the last occurrence, as in `build`.
    pub fn from_classified(
        classified: Vec<ClassifiedDocument>,
        patterns: &PatternLibrary,
        scorer: &RelationshipScorer,
        similarity: &dyn SimilarityProvider,
    ) -> Self {
        let unique: BTreeMap<String, ClassifiedDocument> = classified
            .into_iter()
            .map(|d| (d.id().to_string(), d))
            .collect();
        let classified: Vec<ClassifiedDocument> = unique.into_values().collect();

        let index = AddressIndex::build(&classified);
        let edges = scorer.build_edges(&classified, &index, similarity);
        let positions = position_map(&classified);

        info!(
            "Snapshot built: {} documents, {} address keys, {} edges (patterns {})",
            classified.len(),
            index.len(),
            edges.len(),
            patterns.version()
        );

        GraphSnapshot {
            documents: classified,
            positions,
            index,
            edges,
            pattern_version: patterns.version().to_string(),
            pattern_fingerprint: patterns.fingerprint().to_string(),
            needs_rebuild: AtomicBool::new(false),
        }
    }

    pub fn documents(&self) -> &[ClassifiedDocument] {
        &self.documents
    }

    pub fn document(&self, id: &str) -> Option<&ClassifiedDocument> {
        self.positions.get(id).map(|&p| &self.documents[p])
    }

    /// Raw inputs, for merging into the next rebuild
    pub fn raw_documents(&self) -> Vec<Document> {
        self.documents.iter().map(|d| d.document.clone()).collect()
    }

    pub fn index(&self) -> &AddressIndex {
        &self.index
    }

    pub fn edges(&self) -> &[RelationshipEdge] {
        &self.edges
    }

    pub fn edges_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a RelationshipEdge> + 'a {
        self.edges.iter().filter(move |e| e.involves(id))
    }

    pub fn pattern_version(&self) -> &str {
        &self.pattern_version
    }

    pub fn mark_needs_rebuild(&self) {
        self.needs_rebuild.store(true, Ordering::Relaxed);
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild.load(Ordering::Relaxed)
    }

    /// Copy without one document: its index entries and edges go with it
    pub fn without_document(&self, id: &str) -> Option<GraphSnapshot> {
        self.positions.get(id)?;

        let documents: Vec<ClassifiedDocument> = self
            .documents
            .iter()
            .filter(|d| d.id() != id)
            .cloned()
            .collect();

        let mut index = self.index.clone();
        index.remove_document(id);

        let edges = self.edges.iter().filter(|e| !e.involves(id)).cloned().collect();

        Some(GraphSnapshot {
            positions: position_map(&documents),
            documents,
            index,
            edges,
            pattern_version: self.pattern_version.clone(),
            pattern_fingerprint: self.pattern_fingerprint.clone(),
            needs_rebuild: AtomicBool::new(self.needs_rebuild()),
        })
    }

    /// SHA-256 over the canonical JSON of nodes, index and edges
    pub fn digest(&self) -> Result<String> {
        let view = DigestView {
            pattern_fingerprint: &self.pattern_fingerprint,
            documents: &self.documents,
            index: self.index.entries(),
            edges: &self.edges,
        };
        let bytes = serde_json::to_vec(&view).context("Failed to serialize snapshot")?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

#[cfg(test)]
impl GraphSnapshot {
    /// Drops a document but leaves its index entries pointing at it
    pub(crate) fn with_dangling_references(&self, id: &str) -> Option<GraphSnapshot> {
        let mut pruned = self.without_document(id)?;
        pruned.index = self.index.clone();
        Some(pruned)
    }
}

fn position_map(documents: &[ClassifiedDocument]) -> HashMap<String, usize> {
    documents
        .iter()
        .enumerate()
        .map(|(i, d)| (d.id().to_string(), i))
        .collect()
}

// ============================================================================
// SNAPSHOT STORE
// ============================================================================

/// Holds the current snapshot and swaps in rebuilt ones
pub struct SnapshotStore {
    current: RwLock<Arc<GraphSnapshot>>,
    patterns: Arc<PatternLibrary>,
    scorer: RelationshipScorer,
    similarity: Arc<dyn SimilarityProvider>,

    /// Serializes writers; readers never take it
    rebuild_lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(
        patterns: Arc<PatternLibrary>,
        scorer: RelationshipScorer,
        similarity: Arc<dyn SimilarityProvider>,
    ) -> Self {
        SnapshotStore {
            current: RwLock::new(Arc::new(GraphSnapshot::empty())),
            patterns,
            scorer,
            similarity,
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Patterns from `patterns_path` (built-in library when unset) + scorer from config
    pub fn from_config(config: &EngineConfig, similarity: Arc<dyn SimilarityProvider>) -> Result<Self> {
        let patterns = match &config.patterns_path {
            Some(path) => PatternLibrary::from_file(path)?,
            None => PatternLibrary::with_defaults(),
        };
        info!("Pattern library {} ({})", patterns.version(), patterns.fingerprint());

        Ok(Self::new(Arc::new(patterns), RelationshipScorer::from_config(config), similarity))
    }

    /// Most recently completed snapshot
    pub fn current(&self) -> Arc<GraphSnapshot> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn swap(&self, snapshot: GraphSnapshot) -> Arc<GraphSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::clone(&snapshot);
        snapshot
    }

    /// Full rebuild from a complete document set
    pub fn rebuild(&self, documents: &[Document]) -> Arc<GraphSnapshot> {
        let _writer = self.rebuild_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let snapshot = GraphSnapshot::build(documents, &self.patterns, &self.scorer, self.similarity.as_ref());
        self.swap(snapshot)
    }

    /// Merge new/updated documents (by id) into the current set and rebuild
    pub fn add_documents(&self, documents: Vec<Document>) -> Arc<GraphSnapshot> {
        let _writer = self.rebuild_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut merged: BTreeMap<String, Document> = self
            .current()
            .raw_documents()
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        let added = documents.len();
        for doc in documents {
            merged.insert(doc.id.clone(), doc);
        }

        info!("Rebuilding snapshot with {} new/updated documents", added);
        let merged: Vec<Document> = merged.into_values().collect();
        let snapshot = GraphSnapshot::build(&merged, &self.patterns, &self.scorer, self.similarity.as_ref());
        self.swap(snapshot)
    }

    /// Storage removed a document: drop it from documents, index and edges
    pub fn invalidate_document(&self, id: &str) -> bool {
        let _writer = self.rebuild_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        match self.current().without_document(id) {
            Some(snapshot) => {
                info!("Invalidated document {}", id);
                self.swap(snapshot);
                true
            }
            None => {
                warn!("Invalidation requested for unknown document {}", id);
                false
            }
        }
    }

    /// Rebuild from the current documents when a query flagged an inconsistency
    pub fn rebuild_if_needed(&self) -> bool {
        let _writer = self.rebuild_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Read under the writer lock so a concurrent add/invalidate is never undone
        let current = self.current();
        if !current.needs_rebuild() {
            return false;
        }
        let snapshot = GraphSnapshot::build(
            &current.raw_documents(),
            &self.patterns,
            &self.scorer,
            self.similarity.as_ref(),
        );
        self.swap(snapshot);
        true
    }
}

// ============================================================================
// TESTS
// ============================================================================
