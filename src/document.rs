// 📄 Document Model - Raw inputs + derived classification
// Inputs (url, content, frontmatter) belong to the import pipeline and are read-only here.
// Derived fields are recomputed from scratch on every classification pass.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// NETWORK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Bitcoin,
    Solana,
    Unknown,
}

impl Network {
    /// Networks a caller may ask for by name
    pub const SUPPORTED: [Network; 3] = [Network::Ethereum, Network::Bitcoin, Network::Solana];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Bitcoin => "bitcoin",
            Network::Solana => "solana",
            Network::Unknown => "unknown",
        }
    }

    /// Parse one of the supported network names (case-insensitive).
    /// `unknown` is not a queryable network and returns None.
    pub fn parse_supported(name: &str) -> Option<Network> {
        let name = name.trim().to_lowercase();
        Network::SUPPORTED
            .iter()
            .copied()
            .find(|network| network.as_str() == name)
    }

    pub fn supported_names() -> Vec<&'static str> {
        Network::SUPPORTED.iter().map(|n| n.as_str()).collect()
    }

    pub fn is_known(&self) -> bool {
        *self != Network::Unknown
    }

    /// Ethereum addresses are case-insensitive hex and normalize to lowercase.
    /// Bitcoin and Solana encodings are case-sensitive and are kept as found.
    pub fn normalize_address(&self, address: &str) -> String {
        match self {
            Network::Ethereum => address.to_lowercase(),
            _ => address.to_string(),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Unknown
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ADDRESS
// ============================================================================

/// A normalized address with its network tag
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockchainAddress {
    pub network: Network,
    pub address: String,
}

impl BlockchainAddress {
    pub fn new(network: Network, address: &str) -> Self {
        BlockchainAddress {
            network,
            address: network.normalize_address(address),
        }
    }
}

// ============================================================================
// RAW DOCUMENT (import collaborator owns these fields)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity - survives reclassification
    #[serde(default = "default_uuid")]
    pub id: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub content: String,

    /// Frontmatter mapping (scraped_date, published_date, minted_date, upload_date, title, tags...)
    #[serde(default)]
    pub frontmatter: BTreeMap<String, serde_json::Value>,

    /// Ingestion timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Document {
    pub fn new(id: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            url: url.into(),
            content: content.into(),
            frontmatter: BTreeMap::new(),
            created_at: None,
        }
    }

    /// Builder: add a frontmatter value
    pub fn with_frontmatter(mut self, key: &str, value: serde_json::Value) -> Self {
        self.frontmatter.insert(key.to_string(), value);
        self
    }

    /// Builder: set ingestion timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Host part of the URL, lowercased, without `www.`
    pub fn domain(&self) -> Option<String> {
        let url = self.url.trim();
        if url.is_empty() {
            return None;
        }

        let without_scheme = url.split("//").nth(1).unwrap_or(url);
        let host = without_scheme
            .split(['/', '?', '#'])
            .next()
            .unwrap_or("")
            .split('@')
            .last()
            .unwrap_or("")
            .split(':')
            .next()
            .unwrap_or("")
            .trim_start_matches("www.")
            .to_lowercase();

        if host.is_empty() || !host.contains('.') {
            None
        } else {
            Some(host)
        }
    }

    /// Frontmatter title, else first markdown heading, else the URL
    pub fn title(&self) -> String {
        if let Some(title) = self.frontmatter.get("title").and_then(|v| v.as_str()) {
            let title = title.trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }

        self.content
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix("# "))
            .map(|heading| heading.trim().to_string())
            .filter(|heading| !heading.is_empty())
            .unwrap_or_else(|| self.url.clone())
    }

    /// String tags listed in frontmatter `tags` (array or comma-separated string)
    pub fn frontmatter_tags(&self) -> Vec<String> {
        match self.frontmatter.get("tags") {
            Some(serde_json::Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(serde_json::Value::String(joined)) => joined
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// RESOLVED DATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// `published:` / `created:` / `minted:` / `uploaded:` in content
    ContentField,
    /// Bare ISO-8601 timestamp in content
    ContentTimestamp,
    /// Frontmatter date field
    Frontmatter,
    /// Ingestion timestamp - NOT an original date
    Ingestion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub source: DateSource,

    /// Which field matched (e.g. "minted", "minted_date")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ResolvedDate {
    /// False when we only know when the document was imported
    pub fn is_original(&self) -> bool {
        self.source != DateSource::Ingestion
    }
}

// ============================================================================
// CLASSIFICATION OUTPUT
// ============================================================================

/// Which classifier rule produced the document-level network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkEvidence {
    SingleNetworkAddresses,
    MajorityAddresses,
    AmbiguousAddresses,
    PlatformImplied,
    AmbiguousPlatforms,
    ContentKeyword,
    NoEvidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    MalformedDate,
    AmbiguousNetwork,
    Unclassified,
}

/// Per-document classification problem. Never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationNote {
    pub kind: NoteKind,
    pub message: String,
}

impl ClassificationNote {
    pub fn new(kind: NoteKind, message: impl Into<String>) -> Self {
        ClassificationNote {
            kind,
            message: message.into(),
        }
    }
}

/// Document plus every derived field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedDocument {
    pub document: Document,

    // ========================================================================
    // DERIVED FIELDS (pure function of url/content/frontmatter + patterns)
    // ========================================================================
    pub title: String,
    pub addresses: Vec<BlockchainAddress>,
    pub network: Network,
    pub network_evidence: NetworkEvidence,
    pub platforms: BTreeSet<String>,
    pub ipfs_hashes: BTreeSet<String>,
    pub token_ids: Vec<String>,
    pub original_date: Option<ResolvedDate>,
    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<ClassificationNote>,
}

impl ClassifiedDocument {
    pub fn id(&self) -> &str {
        &self.document.id
    }

    /// Date used for temporal comparisons: original date when resolved, else ingestion day
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.original_date
            .as_ref()
            .map(|d| d.date)
            .or_else(|| self.document.created_at.map(|ts| ts.date_naive()))
    }

    pub fn has_address(&self, address: &str) -> bool {
        self.addresses.iter().any(|a| a.address == address)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_network_parse_supported() {
        assert_eq!(Network::parse_supported("ethereum"), Some(Network::Ethereum));
        assert_eq!(Network::parse_supported("Solana"), Some(Network::Solana));
        assert_eq!(Network::parse_supported("unknown"), None);
        assert_eq!(Network::parse_supported("dogecoin"), None);
    }

    #[test]
    fn test_address_normalization() {
        let eth = BlockchainAddress::new(Network::Ethereum, "0xABCdef");
        assert_eq!(eth.address, "0xabcdef");

        let sol = BlockchainAddress::new(Network::Solana, "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(sol.address, "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
    }

    #[test]
    fn test_domain_extraction() {
        let doc = Document::new("a", "https://www.OpenSea.io/assets/ethereum/0x1/1", "");
        assert_eq!(doc.domain(), Some("opensea.io".to_string()));

        let doc = Document::new("b", "foundation.app/@artist", "");
        assert_eq!(doc.domain(), Some("foundation.app".to_string()));

        let doc = Document::new("c", "", "");
        assert_eq!(doc.domain(), None);
    }

    #[test]
    fn test_title_fallbacks() {
        let doc = Document::new("a", "https://x.io", "intro\n# My Mint\nbody")
            .with_frontmatter("title", json!("Frontmatter Title"));
        assert_eq!(doc.title(), "Frontmatter Title");

        let doc = Document::new("b", "https://x.io", "intro\n# My Mint\nbody");
        assert_eq!(doc.title(), "My Mint");

        let doc = Document::new("c", "https://x.io", "no heading");
        assert_eq!(doc.title(), "https://x.io");
    }

    #[test]
    fn test_frontmatter_tags() {
        let doc = Document::new("a", "", "").with_frontmatter("tags", json!(["Art", "generative"]));
        assert_eq!(doc.frontmatter_tags(), vec!["art", "generative"]);

        let doc = Document::new("b", "", "").with_frontmatter("tags", json!("pfp, 1/1"));
        assert_eq!(doc.frontmatter_tags(), vec!["pfp", "1/1"]);
    }

    #[test]
    fn test_missing_id_gets_uuid() {
        let doc: Document = serde_json::from_value(json!({"url": "https://x.io"})).unwrap();
        assert!(!doc.id.is_empty());
        assert!(uuid::Uuid::parse_str(&doc.id).is_ok());
    }
}
