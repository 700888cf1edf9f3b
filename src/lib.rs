// Provenance Graph - Core Library
// Classification + relationship engine shared by the CLI, the API server and tests

pub mod config;
pub mod document;
pub mod patterns;       // Pattern Library - versioned regex/keyword tables
pub mod extractor;      // Address Extractor
pub mod network;        // Network Classifier
pub mod platform;       // Platform Inferrer
pub mod dates;          // Date Resolver
pub mod classifier;
pub mod index;          // Address Index
pub mod relationships;  // Relationship Scorer
pub mod snapshot;
pub mod query;          // Query Service
pub mod db;
pub mod export;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::EngineConfig;
pub use document::{
    BlockchainAddress, ClassificationNote, ClassifiedDocument, DateSource, Document,
    Network, NetworkEvidence, NoteKind, ResolvedDate,
};
pub use patterns::{PatternDefinition, PatternLibrary};
pub use extractor::AddressExtractor;
pub use network::NetworkClassifier;
pub use platform::PlatformInferrer;
pub use dates::{parse_date_value, DateResolution, DateResolver};
pub use classifier::DocumentClassifier;
pub use index::{AddressIndex, AddressIndexEntry};
pub use relationships::{
    NoSimilarity, RelationshipEdge, RelationshipScorer, RelationshipSignal,
    RelationshipType, SimilarityProvider, StaticSimilarity,
};
pub use snapshot::{GraphSnapshot, SnapshotStore};
pub use query::{
    AddressListEntry, AddressListResponse, AddressQueryResponse, DocumentSummary,
    MintRecord, NetworkQueryResponse, QueryError, QueryService, RelatedResponse,
};
pub use db::{
    ImportStats,
    setup_database, insert_documents, get_all_documents, delete_document,
    verify_count, load_documents_json,
};
pub use export::{export_edges_csv, export_nodes_csv};

#[cfg(feature = "server")]
pub use api::{build_router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
