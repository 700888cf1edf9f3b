// 🔗 Relationship Scorer - Weighted edges between classified documents
//
// Edge strength = the MAXIMUM weight among qualifying relationship types (never a sum).
// Ties go to the earlier type in PRIORITY order.
// Candidate pairs come from shared buckets (address, ipfs, platform, network,
// domain, date window, external similarity), never from a full nested scan.

use crate::config::EngineConfig;
use crate::document::{ClassifiedDocument, Network};
use crate::index::AddressIndex;
use chrono::Datelike;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{info, warn};

// ============================================================================
// RELATIONSHIP TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Shared wallet/contract address
    BlockchainAddress,

    /// Shared IPFS hash
    IpfsContent,

    /// Shared marketplace
    BlockchainPlatform,

    /// Same document-level network (unknown never matches)
    BlockchainNetwork,

    /// Same URL host
    DomainSibling,

    /// External similarity score, its own weight
    SemanticSimilarity,

    /// Effective dates within the temporal window
    TemporalProximity,
}

impl RelationshipType {
    /// Tie-break order, strongest evidence first
    pub const PRIORITY: [RelationshipType; 7] = [
        RelationshipType::BlockchainAddress,
        RelationshipType::IpfsContent,
        RelationshipType::BlockchainPlatform,
        RelationshipType::BlockchainNetwork,
        RelationshipType::DomainSibling,
        RelationshipType::SemanticSimilarity,
        RelationshipType::TemporalProximity,
    ];

    /// Fixed weight; None for semantic similarity (weight = external score)
    pub fn base_weight(&self) -> Option<f64> {
        match self {
            RelationshipType::BlockchainAddress => Some(0.98),
            RelationshipType::IpfsContent => Some(0.95),
            RelationshipType::BlockchainPlatform => Some(0.80),
            RelationshipType::BlockchainNetwork => Some(0.70),
            RelationshipType::DomainSibling => Some(0.60),
            RelationshipType::SemanticSimilarity => None,
            RelationshipType::TemporalProximity => Some(0.40),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::BlockchainAddress => "blockchain_address",
            RelationshipType::IpfsContent => "ipfs_content",
            RelationshipType::BlockchainPlatform => "blockchain_platform",
            RelationshipType::BlockchainNetwork => "blockchain_network",
            RelationshipType::DomainSibling => "domain_sibling",
            RelationshipType::SemanticSimilarity => "semantic_similarity",
            RelationshipType::TemporalProximity => "temporal_proximity",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EDGE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSignal {
    pub relationship_type: RelationshipType,
    pub weight: f64,
}

/// Undirected edge stored once per pair, source < target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub source: String,
    pub target: String,

    /// Dominant type
    pub relationship_type: RelationshipType,

    /// In [0.0, 1.0]
    pub strength: f64,

    /// Every qualifying type, in priority order
    pub signals: Vec<RelationshipSignal>,
}

impl RelationshipEdge {
    pub fn involves(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }

    /// The other end of the edge
    pub fn neighbor(&self, id: &str) -> Option<&str> {
        if self.source == id {
            Some(&self.target)
        } else if self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }
}

// ============================================================================
// SEMANTIC SIMILARITY (external input)
// ============================================================================

/// Opaque similarity supplied by an outside model
pub trait SimilarityProvider: Send + Sync {
    /// Score in [0, 1]; None when no score exists for the pair
    fn similarity(&self, a: &ClassifiedDocument, b: &ClassifiedDocument) -> Option<f64>;

    /// Extra pairs (document ids) worth scoring beyond the shared buckets
    fn candidate_pairs(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// No external scores
pub struct NoSimilarity;

impl SimilarityProvider for NoSimilarity {
    fn similarity(&self, _a: &ClassifiedDocument, _b: &ClassifiedDocument) -> Option<f64> {
        None
    }
}

/// Precomputed pairwise scores (e.g. loaded from an embedding job)
#[derive(Debug, Clone, Default)]
pub struct StaticSimilarity {
    scores: HashMap<(String, String), f64>,
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl StaticSimilarity {
    pub fn new() -> Self {
        StaticSimilarity::default()
    }

    pub fn with_score(mut self, a: &str, b: &str, score: f64) -> Self {
        self.scores.insert(ordered_pair(a, b), score);
        self
    }
}

impl SimilarityProvider for StaticSimilarity {
    fn similarity(&self, a: &ClassifiedDocument, b: &ClassifiedDocument) -> Option<f64> {
        self.scores.get(&ordered_pair(a.id(), b.id())).copied()
    }

    fn candidate_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self.scores.keys().cloned().collect();
        pairs.sort();
        pairs
    }
}

// ============================================================================
// SCORER
// ============================================================================

#[derive(Debug, Clone)]
pub struct RelationshipScorer {
    /// Max |date_a - date_b| in days for temporal proximity
    pub temporal_window_days: i64,

    /// External similarity below this does not qualify
    pub min_semantic_similarity: f64,
}

impl RelationshipScorer {
    pub fn new() -> Self {
        RelationshipScorer {
            temporal_window_days: 7,
            min_semantic_similarity: 0.5,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        RelationshipScorer {
            temporal_window_days: config.temporal_window_days.max(0),
            min_semantic_similarity: config.min_semantic_similarity,
        }
    }

    /// Strongest relationship for a pair; None when nothing qualifies
    pub fn score_pair(
        &self,
        a: &ClassifiedDocument,
        b: &ClassifiedDocument,
        similarity: &dyn SimilarityProvider,
    ) -> Option<RelationshipEdge> {
        if a.id() == b.id() {
            return None;
        }

        let mut signals = Vec::new();

        if a.addresses.iter().any(|x| b.addresses.iter().any(|y| x.address == y.address)) {
            signals.push(fixed(RelationshipType::BlockchainAddress));
        }

        if !a.ipfs_hashes.is_disjoint(&b.ipfs_hashes) {
            signals.push(fixed(RelationshipType::IpfsContent));
        }

        if !a.platforms.is_disjoint(&b.platforms) {
            signals.push(fixed(RelationshipType::BlockchainPlatform));
        }

        if a.network.is_known() && a.network == b.network {
            signals.push(fixed(RelationshipType::BlockchainNetwork));
        }

        if let (Some(da), Some(db)) = (a.document.domain(), b.document.domain()) {
            if da == db {
                signals.push(fixed(RelationshipType::DomainSibling));
            }
        }

        if let Some(score) = similarity.similarity(a, b) {
            if score.is_finite() {
                let score = score.clamp(0.0, 1.0);
                if score > 0.0 && score >= self.min_semantic_similarity {
                    signals.push(RelationshipSignal {
                        relationship_type: RelationshipType::SemanticSimilarity,
                        weight: score,
                    });
                }
            }
        }

        if let (Some(da), Some(db)) = (a.effective_date(), b.effective_date()) {
            if (da - db).num_days().abs() <= self.temporal_window_days {
                signals.push(fixed(RelationshipType::TemporalProximity));
            }
        }

        // Signals are already in priority order; strict > keeps the earlier type on ties
        let mut best: Option<&RelationshipSignal> = None;
        for signal in &signals {
            if best.map_or(true, |current| signal.weight > current.weight) {
                best = Some(signal);
            }
        }
        let (relationship_type, strength) = best.map(|s| (s.relationship_type, s.weight))?;

        let (source, target) = ordered_pair(a.id(), b.id());
        Some(RelationshipEdge {
            source,
            target,
            relationship_type,
            strength,
            signals,
        })
    }

    /// Candidate pairs (document positions, i < j) sharing at least one bucket
    pub fn candidate_pairs(
        &self,
        documents: &[ClassifiedDocument],
        index: &AddressIndex,
        similarity: &dyn SimilarityProvider,
    ) -> BTreeSet<(usize, usize)> {
        let positions: HashMap<&str, usize> = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (doc.id(), i))
            .collect();

        let mut buckets: Vec<Vec<usize>> = Vec::new();

        // Shared address - straight from the inverted index
        let mut by_address: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for entry in index.entries() {
            for id in &entry.document_ids {
                match positions.get(id.as_str()) {
                    Some(&p) => by_address.entry(entry.address.as_str()).or_default().push(p),
                    None => warn!("Address index references missing document {}", id),
                }
            }
        }
        buckets.extend(by_address.into_values());

        let mut by_ipfs: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut by_platform: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut by_network: BTreeMap<Network, Vec<usize>> = BTreeMap::new();
        let mut by_domain: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_day_range: BTreeMap<i64, Vec<usize>> = BTreeMap::new();

        // Same bucket ⇒ within the window; adjacent buckets are checked exactly
        let bucket_width = self.temporal_window_days.max(0).saturating_add(1);

        for (i, doc) in documents.iter().enumerate() {
            for hash in &doc.ipfs_hashes {
                by_ipfs.entry(hash.as_str()).or_default().push(i);
            }
            for platform in &doc.platforms {
                by_platform.entry(platform.as_str()).or_default().push(i);
            }
            if doc.network.is_known() {
                by_network.entry(doc.network).or_default().push(i);
            }
            if let Some(domain) = doc.document.domain() {
                by_domain.entry(domain).or_default().push(i);
            }
            if let Some(date) = doc.effective_date() {
                let day = date.num_days_from_ce() as i64;
                by_day_range.entry(day.div_euclid(bucket_width)).or_default().push(i);
            }
        }

        buckets.extend(by_ipfs.into_values());
        buckets.extend(by_platform.into_values());
        buckets.extend(by_network.into_values());
        buckets.extend(by_domain.into_values());

        let mut pairs = BTreeSet::new();
        for bucket in &buckets {
            add_bucket_pairs(&mut pairs, bucket);
        }

        for (range, members) in &by_day_range {
            add_bucket_pairs(&mut pairs, members);
            if let Some(next) = by_day_range.get(&(range + 1)) {
                for &i in members {
                    for &j in next {
                        insert_pair(&mut pairs, i, j);
                    }
                }
            }
        }

        for (a, b) in similarity.candidate_pairs() {
            if let (Some(&i), Some(&j)) = (positions.get(a.as_str()), positions.get(b.as_str())) {
                insert_pair(&mut pairs, i, j);
            }
        }

        pairs
    }

    /// Score every candidate pair in parallel; edges sorted by (source, target)
    pub fn build_edges(
        &self,
        documents: &[ClassifiedDocument],
        index: &AddressIndex,
        similarity: &dyn SimilarityProvider,
    ) -> Vec<RelationshipEdge> {
        let candidates: Vec<(usize, usize)> = self
            .candidate_pairs(documents, index, similarity)
            .into_iter()
            .collect();

        let full_scan = documents.len().saturating_mul(documents.len().saturating_sub(1)) / 2;
        info!(
            "Scoring {} candidate pairs across {} documents (full scan would be {})",
            candidates.len(),
            documents.len(),
            full_scan
        );

        let mut edges: Vec<RelationshipEdge> = candidates
            .par_iter()
            .filter_map(|&(i, j)| self.score_pair(&documents[i], &documents[j], similarity))
            .collect();

        edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

        let mut seen = HashSet::new();
        edges.retain(|e| seen.insert((e.source.clone(), e.target.clone())));

        edges
    }
}

impl Default for RelationshipScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn fixed(relationship_type: RelationshipType) -> RelationshipSignal {
    RelationshipSignal {
        relationship_type,
        weight: relationship_type.base_weight().unwrap_or_default(),
    }
}

fn insert_pair(pairs: &mut BTreeSet<(usize, usize)>, i: usize, j: usize) {
    if i != j {
        pairs.insert((i.min(j), i.max(j)));
    }
}

fn add_bucket_pairs(pairs: &mut BTreeSet<(usize, usize)>, members: &[usize]) {
    for (n, &i) in members.iter().enumerate() {
        for &j in &members[n + 1..] {
            insert_pair(pairs, i, j);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
