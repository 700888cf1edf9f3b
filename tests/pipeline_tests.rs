//! End-to-end tests: documents → classification → index → edges → queries

use chrono::NaiveDate;
use provenance_graph::{
    get_all_documents, insert_documents, setup_database, DateSource, Document, GraphSnapshot, Network,
    NoSimilarity, PatternLibrary, QueryService, RelationshipScorer, RelationshipType, SnapshotStore,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::Arc;

const ETH: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb1";
const ETH_LOWER: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb1";
const ETH_OTHER: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";
const BTC: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

fn build(docs: &[Document]) -> GraphSnapshot {
    GraphSnapshot::build(docs, &PatternLibrary::with_defaults(), &RelationshipScorer::new(), &NoSimilarity)
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new(
            "listing",
            format!("https://opensea.io/assets/{}", ETH),
            "# Sunset #1\nminted: 2022-08-15\n",
        ),
        Document::new(
            "profile",
            "https://foundation.app/@artist",
            format!("Collector wallet {} also holds bitcoin at {}", ETH, BTC),
        )
        .with_frontmatter("published_date", json!("2022-08-18")),
        Document::new(
            "inscription",
            "https://ordinals.com/inscription/42",
            format!("Inscribed to {}", BTC),
        )
        .with_frontmatter("minted_date", json!("2023-02-01")),
        Document::new("poem", "https://blog.example/poem", "A poem about sunsets."),
        Document::new(
            "drop",
            "https://magiceden.io/item-details/abc",
            "Solana drop, mint address 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        ),
    ]
}

#[test]
fn test_opensea_listing_classification() {
    let snapshot = build(&corpus());
    let listing = snapshot.document("listing").unwrap();

    assert_eq!(listing.addresses.len(), 1);
    assert_eq!(listing.addresses[0].address, ETH_LOWER);
    assert_eq!(listing.addresses[0].network, Network::Ethereum);
    assert!(listing.platforms.contains("OpenSea"));
    assert_eq!(listing.network, Network::Ethereum);

    let date = listing.original_date.as_ref().unwrap();
    assert_eq!(date.date, NaiveDate::from_ymd_opt(2022, 8, 15).unwrap());
    assert_eq!(date.source, DateSource::ContentField);
}

#[test]
fn test_unclassified_document_stays_unknown() {
    let snapshot = build(&corpus());
    let poem = snapshot.document("poem").unwrap();

    assert_eq!(poem.network, Network::Unknown);
    assert!(poem.addresses.is_empty());
    assert!(poem.platforms.is_empty());
    assert!(poem.original_date.is_none());
}

#[test]
fn test_by_network_majority_document() {
    let docs = vec![
        Document::new("mixed", "", format!("{} {} {}", ETH, ETH_OTHER, BTC)),
        Document::new("btc", "", BTC),
    ];
    let queries = QueryService::new(Arc::new(build(&docs)), 10);

    let eth = queries.by_network("ethereum").unwrap();
    assert_eq!(eth.count, 1);
    assert_eq!(eth.mints[0].id, "mixed");
    assert!(eth.mints.iter().all(|m| m.blockchain_network == Network::Ethereum));

    let btc = queries.by_network("bitcoin").unwrap();
    assert_eq!(btc.count, 1);
    assert_eq!(btc.mints[0].id, "btc");

    assert!(queries.by_network("dogecoin").is_err());
}

#[test]
fn test_by_address_spans_networks_and_case() {
    let queries = QueryService::new(Arc::new(build(&corpus())), 10);

    let response = queries.by_address(ETH);
    let ids: Vec<&str> = response.mints.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["listing", "profile"]);

    let btc = queries.by_address(BTC);
    assert_eq!(btc.count, 2);

    let missing = queries.by_address("0x0000000000000000000000000000000000000000");
    assert_eq!(missing.count, 0);
}

#[test]
fn test_temporal_proximity_scenario() {
    let docs = vec![
        Document::new("a", "https://one.example", "").with_frontmatter("minted_date", json!("2022-08-15")),
        Document::new("b", "https://two.example", "").with_frontmatter("minted_date", json!("2022-08-20")),
        Document::new("c", "https://three.example", "").with_frontmatter("minted_date", json!("2022-09-01")),
    ];
    let snapshot = build(&docs);

    assert_eq!(snapshot.edges().len(), 1);
    let edge = &snapshot.edges()[0];
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("a", "b"));
    assert_eq!(edge.relationship_type, RelationshipType::TemporalProximity);
    assert_eq!(edge.strength, 0.40);
}

#[test]
fn test_platform_and_network_yield_one_platform_edge() {
    let docs = vec![
        Document::new("a", "https://opensea.io/collection/one", "ethereum generative art"),
        Document::new("b", "https://x.com/status/1", "now listed on OpenSea"),
    ];
    let snapshot = build(&docs);

    assert_eq!(snapshot.edges().len(), 1);
    let edge = &snapshot.edges()[0];
    assert_eq!(edge.relationship_type, RelationshipType::BlockchainPlatform);
    assert_eq!(edge.strength, 0.80);
}

#[test]
fn test_edge_strengths_are_max_of_qualifying_weights() {
    let snapshot = build(&corpus());
    assert!(!snapshot.edges().is_empty());

    for edge in snapshot.edges() {
        assert!((0.0..=1.0).contains(&edge.strength));
        let max = edge
            .signals
            .iter()
            .map(|s| s.weight)
            .fold(f64::MIN, f64::max);
        assert_eq!(edge.strength, max);
    }

    let shared = snapshot
        .edges()
        .iter()
        .find(|e| e.source == "listing" && e.target == "profile")
        .unwrap();
    assert_eq!(shared.relationship_type, RelationshipType::BlockchainAddress);
}

#[test]
fn test_rebuild_is_byte_identical() {
    let first = build(&corpus());
    let mut shuffled = corpus();
    shuffled.rotate_left(2);
    let second = build(&shuffled);

    assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    assert_eq!(
        serde_json::to_string(first.edges()).unwrap(),
        serde_json::to_string(second.edges()).unwrap()
    );
    assert_eq!(
        serde_json::to_string(first.index().entries()).unwrap(),
        serde_json::to_string(second.index().entries()).unwrap()
    );
}

#[test]
fn test_sqlite_round_trip_feeds_snapshot() {
    let mut conn = Connection::open_in_memory().unwrap();
    setup_database(&conn).unwrap();
    insert_documents(&mut conn, &corpus()).unwrap();

    let stored = get_all_documents(&conn).unwrap();
    assert_eq!(stored.len(), 5);

    let store = SnapshotStore::new(
        Arc::new(PatternLibrary::with_defaults()),
        RelationshipScorer::new(),
        Arc::new(NoSimilarity),
    );
    let from_db = store.rebuild(&stored);
    assert_eq!(from_db.digest().unwrap(), build(&corpus()).digest().unwrap());
}

#[test]
fn test_invalidated_document_disappears_from_queries() {
    let store = SnapshotStore::new(
        Arc::new(PatternLibrary::with_defaults()),
        RelationshipScorer::new(),
        Arc::new(NoSimilarity),
    );
    store.rebuild(&corpus());
    assert!(store.invalidate_document("listing"));

    let queries = QueryService::new(store.current(), 10);
    let response = queries.by_address(ETH);
    assert_eq!(response.count, 1);
    assert_eq!(response.mints[0].id, "profile");
    assert!(queries.related("listing").is_err());
}
