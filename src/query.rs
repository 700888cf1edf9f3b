// 🔎 Query Service - read-only projections over one graph snapshot
//
// A query never waits for a rebuild: it works on the Arc it was handed.
// Index or edge entries pointing at missing documents are dropped from the
// answer and the snapshot is flagged for the next rebuild.

use crate::document::{ClassifiedDocument, DateSource, Network};
use crate::relationships::RelationshipType;
use crate::snapshot::GraphSnapshot;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Invalid network '{}'; allowed networks: {}", .requested, .allowed.join(", "))]
    InvalidNetwork { requested: String, allowed: Vec<String> },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),
}

// ============================================================================
// RESPONSE SHAPES
// ============================================================================

/// Full document projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub blockchain_network: Network,
    pub platforms: BTreeSet<String>,
    pub token_ids: Vec<String>,
    pub ipfs_hashes: BTreeSet<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub original_date: Option<NaiveDate>,
    pub original_date_source: Option<DateSource>,

    /// False when original_date is only the ingestion date
    pub date_is_original: bool,
    pub tags: BTreeSet<String>,
}

impl From<&ClassifiedDocument> for MintRecord {
    fn from(doc: &ClassifiedDocument) -> Self {
        MintRecord {
            id: doc.id().to_string(),
            title: doc.title.clone(),
            url: doc.document.url.clone(),
            blockchain_network: doc.network,
            platforms: doc.platforms.clone(),
            token_ids: doc.token_ids.clone(),
            ipfs_hashes: doc.ipfs_hashes.clone(),
            created_at: doc.document.created_at,
            original_date: doc.original_date.as_ref().map(|d| d.date),
            original_date_source: doc.original_date.as_ref().map(|d| d.source),
            date_is_original: doc.original_date.as_ref().map_or(false, |d| d.is_original()),
            tags: doc.tags.clone(),
        }
    }
}

/// Short form used in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub blockchain_network: Network,
}

impl From<&ClassifiedDocument> for DocumentSummary {
    fn from(doc: &ClassifiedDocument) -> Self {
        DocumentSummary {
            id: doc.id().to_string(),
            title: doc.title.clone(),
            url: doc.document.url.clone(),
            blockchain_network: doc.network,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressQueryResponse {
    pub address: String,
    pub count: usize,
    pub mints: Vec<MintRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkQueryResponse {
    pub network: Network,
    pub count: usize,
    pub mints: Vec<MintRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressListEntry {
    pub address: String,
    pub network: Network,

    /// All documents under the key, even when `documents` is truncated
    pub document_count: usize,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressListResponse {
    pub total_addresses: usize,
    pub offset: usize,
    pub addresses: Vec<AddressListEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedDocument {
    pub document: DocumentSummary,
    pub relationship_type: RelationshipType,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedResponse {
    pub id: String,
    pub count: usize,
    pub related: Vec<RelatedDocument>,
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct QueryService {
    snapshot: Arc<GraphSnapshot>,
    max_documents_per_address: usize,
}

impl QueryService {
    pub fn new(snapshot: Arc<GraphSnapshot>, max_documents_per_address: usize) -> Self {
        QueryService {
            snapshot,
            max_documents_per_address,
        }
    }

    fn resolve(&self, id: &str) -> Option<&ClassifiedDocument> {
        let doc = self.snapshot.document(id);
        if doc.is_none() {
            warn!("Index inconsistency: document {} is referenced but missing", id);
            self.snapshot.mark_needs_rebuild();
        }
        doc
    }

    /// Every document whose addresses contain this literal, on any network.
    /// Unknown address is an empty answer, not an error.
    pub fn by_address(&self, address: &str) -> AddressQueryResponse {
        let mints: Vec<MintRecord> = self
            .snapshot
            .index()
            .document_ids(address)
            .iter()
            .filter_map(|id| self.resolve(id))
            .map(MintRecord::from)
            .collect();

        AddressQueryResponse {
            address: address.to_string(),
            count: mints.len(),
            mints,
        }
    }

    /// Documents classified to one of the supported networks
    pub fn by_network(&self, network: &str) -> Result<NetworkQueryResponse, QueryError> {
        let network = Network::parse_supported(network).ok_or_else(|| QueryError::InvalidNetwork {
            requested: network.to_string(),
            allowed: Network::supported_names().into_iter().map(String::from).collect(),
        })?;

        let mints: Vec<MintRecord> = self
            .snapshot
            .documents()
            .iter()
            .filter(|doc| doc.network == network)
            .map(MintRecord::from)
            .collect();

        Ok(NetworkQueryResponse {
            network,
            count: mints.len(),
            mints,
        })
    }

    /// Address index keys in first-seen order, one page at a time
    pub fn all_addresses(&self, offset: usize, limit: Option<usize>) -> AddressListResponse {
        let index = self.snapshot.index();
        let page = index.page(offset, limit.unwrap_or(usize::MAX));

        let addresses = page
            .iter()
            .map(|entry| {
                let resolved: Vec<&ClassifiedDocument> = entry
                    .document_ids
                    .iter()
                    .filter_map(|id| self.resolve(id))
                    .collect();

                AddressListEntry {
                    address: entry.address.clone(),
                    network: entry.network,
                    document_count: resolved.len(),
                    documents: resolved
                        .into_iter()
                        .take(self.max_documents_per_address)
                        .map(DocumentSummary::from)
                        .collect(),
                }
            })
            .collect();

        AddressListResponse {
            total_addresses: index.len(),
            offset,
            addresses,
        }
    }

    /// Neighbours of a document, strongest edge first
    pub fn related(&self, id: &str) -> Result<RelatedResponse, QueryError> {
        if self.snapshot.document(id).is_none() {
            return Err(QueryError::DocumentNotFound(id.to_string()));
        }

        let mut related: Vec<RelatedDocument> = self
            .snapshot
            .edges_for(id)
            .filter_map(|edge| {
                let neighbor = self.resolve(edge.neighbor(id)?)?;
                Some(RelatedDocument {
                    document: DocumentSummary::from(neighbor),
                    relationship_type: edge.relationship_type,
                    strength: edge.strength,
                })
            })
            .collect();

        related.sort_by(|a, b| {
            b.strength
                .total_cmp(&a.strength)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });

        Ok(RelatedResponse {
            id: id.to_string(),
            count: related.len(),
            related,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::patterns::PatternLibrary;
    use crate::relationships::{NoSimilarity, RelationshipScorer};
    use serde_json::json;

    const ETH: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb1";
    const BTC: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    fn service(docs: Vec<Document>, max_docs: usize) -> QueryService {
        let snapshot = GraphSnapshot::build(
            &docs,
            &PatternLibrary::with_defaults(),
            &RelationshipScorer::new(),
            &NoSimilarity,
        );
        QueryService::new(Arc::new(snapshot), max_docs)
    }

    fn sample() -> Vec<Document> {
        vec![
            Document::new("a", "https://opensea.io/assets/x", format!("minted: 2022-08-15 {}", ETH)),
            Document::new("b", "https://blog.example", format!("{} {} {}", ETH, ETH.replace('7', "8"), BTC)),
            Document::new("c", "https://ordinals.com/inscription/1", "bitcoin ordinal"),
        ]
    }

    #[test]
    fn test_by_address() {
        let service = service(sample(), 10);
        let response = service.by_address(&ETH.to_uppercase().replace("0X", "0x"));

        assert_eq!(response.count, 2);
        let ids: Vec<&str> = response.mints.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(response.mints[0].original_date, NaiveDate::from_ymd_opt(2022, 8, 15));
        assert!(response.mints[0].date_is_original);
    }

    #[test]
    fn test_unknown_address_is_empty() {
        let response = service(sample(), 10).by_address("0xnothing");
        assert_eq!(response.count, 0);
        assert!(response.mints.is_empty());
    }

    #[test]
    fn test_by_network_majority() {
        let service = service(sample(), 10);

        let eth = service.by_network("ethereum").unwrap();
        let ids: Vec<&str> = eth.mints.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(eth.mints.iter().all(|m| m.blockchain_network == Network::Ethereum));

        let btc = service.by_network("Bitcoin").unwrap();
        assert_eq!(btc.count, 1);
        assert_eq!(btc.mints[0].id, "c");
    }

    #[test]
    fn test_by_network_rejects_unsupported() {
        let service = service(sample(), 10);
        let err = service.by_network("dogecoin").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid network 'dogecoin'; allowed networks: ethereum, bitcoin, solana"
        );
        assert!(service.by_network("unknown").is_err());
    }

    #[test]
    fn test_all_addresses_bounded() {
        let service = service(sample(), 1);
        let response = service.all_addresses(0, None);

        assert_eq!(response.total_addresses, 3);
        let first = &response.addresses[0];
        assert_eq!(first.address, ETH);
        assert_eq!(first.document_count, 2);
        assert_eq!(first.documents.len(), 1);

        let page = service.all_addresses(2, Some(5));
        assert_eq!(page.addresses.len(), 1);
        assert_eq!(page.addresses[0].network, Network::Bitcoin);
        assert_eq!(page.total_addresses, 3);
    }

    #[test]
    fn test_related() {
        let service = service(sample(), 10);
        let response = service.related("a").unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.related[0].document.id, "b");
        assert_eq!(response.related[0].relationship_type, RelationshipType::BlockchainAddress);

        assert_eq!(
            service.related("missing").unwrap_err(),
            QueryError::DocumentNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_ingestion_date_is_flagged() {
        let created = DateTime::parse_from_rfc3339("2024-01-02T10:00:00Z").unwrap().with_timezone(&Utc);
        let doc = Document::new("a", "", ETH)
            .with_created_at(created)
            .with_frontmatter("title", json!("Untitled"));
        let response = service(vec![doc], 10).by_address(ETH);

        let mint = &response.mints[0];
        assert_eq!(mint.original_date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(mint.original_date_source, Some(DateSource::Ingestion));
        assert!(!mint.date_is_original);
    }

    #[test]
    fn test_missing_document_flags_rebuild() {
        let docs = sample();
        let store = crate::snapshot::SnapshotStore::new(
            Arc::new(PatternLibrary::with_defaults()),
            RelationshipScorer::new(),
            Arc::new(NoSimilarity),
        );
        let snapshot = store.rebuild(&docs);
        let service = QueryService::new(Arc::clone(&snapshot), 10);
        assert!(service.resolve("ghost").is_none());
        assert!(snapshot.needs_rebuild());
    }

    #[test]
    fn test_address_listing_counts_only_resolved_documents() {
        let snapshot = GraphSnapshot::build(
            &sample(),
            &PatternLibrary::with_defaults(),
            &RelationshipScorer::new(),
            &NoSimilarity,
        );
        let broken = Arc::new(snapshot.with_dangling_references("a").unwrap());
        let service = QueryService::new(Arc::clone(&broken), 10);

        let response = service.all_addresses(0, None);
        let eth = response.addresses.iter().find(|e| e.address == ETH).unwrap();
        assert_eq!(eth.document_count, 1);
        assert_eq!(eth.documents.len(), 1);
        assert_eq!(eth.documents[0].id, "b");
        assert!(broken.needs_rebuild());
    }
}
