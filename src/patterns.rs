// 🧩 Pattern Library - Patterns as Data
// Address formats, explorer links, platform keywords and date fields.
// Loaded once, versioned, and passed by reference into every extractor.

use crate::document::Network;
use anyhow::{Context as AnyhowContext, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

// ============================================================================
// DEFINITION (serializable)
// ============================================================================

/// Block explorer link that implies a network for the captured address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerPattern {
    pub name: String,

    /// Regex with the address in capture group 1
    pub pattern: String,

    pub network: Network,
}

/// Marketplace / listing site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEntry {
    /// Display label (e.g. "OpenSea")
    pub name: String,

    /// Case-insensitive substrings matched against url + content
    pub keywords: Vec<String>,

    /// Every platform implies exactly one network
    pub network: Network,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkKeyword {
    pub keyword: String,
    pub network: Network,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub version: String,

    /// Address regexes; capture group 1, when present, is the address itself
    pub ethereum_address: String,
    pub bitcoin_address: String,
    pub solana_address: String,

    /// Solana matches only count when this token appears in url or content
    pub solana_guard_keyword: String,

    pub ipfs_hash: String,

    /// Regexes with the token id in capture group 1
    pub token_id_patterns: Vec<String>,

    pub explorers: Vec<ExplorerPattern>,
    pub platforms: Vec<PlatformEntry>,
    pub network_keywords: Vec<NetworkKeyword>,

    /// `<field>: YYYY-MM-DD` labels in content, highest priority first
    pub content_date_fields: Vec<String>,

    pub iso_timestamp: String,

    /// Frontmatter keys, highest priority first
    pub frontmatter_date_fields: Vec<String>,
}

fn platform(name: &str, keywords: &[&str], network: Network) -> PlatformEntry {
    PlatformEntry {
        name: name.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        network,
    }
}

fn explorer(name: &str, pattern: &str, network: Network) -> ExplorerPattern {
    ExplorerPattern {
        name: name.to_string(),
        pattern: pattern.to_string(),
        network,
    }
}

const BASE58: &str = "[1-9A-HJ-NP-Za-km-z]";
const BECH32: &str = "[02-9ac-hj-np-z]";

impl Default for PatternDefinition {
    fn default() -> Self {
        let evm_address = "(0x[a-fA-F0-9]{40})";
        let btc_address = format!("([13]{b58}{{25,34}}|bc1{b32}{{11,71}})", b58 = BASE58, b32 = BECH32);
        let sol_address = format!("({}{{32,44}})", BASE58);

        PatternDefinition {
            version: "2024.1".to_string(),

            // Bounded by non-hex characters only, so `owner_0x…` and `0x…_v2` still match
            ethereum_address: r"(?:^|[^0-9a-fA-F])(0x[a-fA-F0-9]{40})(?:[^0-9a-fA-F]|$)".to_string(),
            bitcoin_address: format!(r"\b(?:[13]{b58}{{25,34}}|bc1{b32}{{11,71}})\b", b58 = BASE58, b32 = BECH32),
            solana_address: format!(r"\b{}{{32,44}}\b", BASE58),
            solana_guard_keyword: "solana".to_string(),

            ipfs_hash: format!(r"\b(?:Qm{}{{44}}|bafy[a-z2-7]{{52,}})\b", BASE58),

            token_id_patterns: vec![
                r"(?i:/assets/(?:[a-z0-9_-]+/)?)0x[a-fA-F0-9]{40}/(\d+)".to_string(),
                r"(?i:/(?:token|nft)/)0x[a-fA-F0-9]{40}[/:](\d+)".to_string(),
                r"(?i)\btoken\s*(?:id)?\s*[:#]\s*#?(\d+)".to_string(),
            ],

            explorers: vec![
                explorer("Etherscan", &format!(r"(?i:etherscan\.io/(?:address|token|nft)/){}", evm_address), Network::Ethereum),
                // EVM-format addresses; tagged with the ethereum address family
                explorer("BSCScan", &format!(r"(?i:bscscan\.com/(?:address|token)/){}", evm_address), Network::Ethereum),
                explorer("Polygonscan", &format!(r"(?i:polygonscan\.com/(?:address|token)/){}", evm_address), Network::Ethereum),
                explorer(
                    "Blockchain.com",
                    &format!(r"(?i:blockchain\.com/(?:explorer/addresses/)?btc/(?:address/)?){}", btc_address),
                    Network::Bitcoin,
                ),
                explorer("Solscan", &format!(r"(?i:solscan\.io/(?:account|token|address)/){}", sol_address), Network::Solana),
            ],

            platforms: vec![
                platform("OpenSea", &["opensea"], Network::Ethereum),
                platform("Foundation", &["foundation.app"], Network::Ethereum),
                platform("1stDibs NFT", &["1stdibs"], Network::Ethereum),
                platform("SuperRare", &["superrare"], Network::Ethereum),
                platform("Rarible", &["rarible"], Network::Ethereum),
                platform("Zora", &["zora.co"], Network::Ethereum),
                platform("Magic Eden", &["magiceden", "magic eden"], Network::Solana),
                platform("Tensor", &["tensor.trade"], Network::Solana),
                platform("Exchange Art", &["exchange.art"], Network::Solana),
                platform("Ordinals", &["ordinals.com", "ord.io"], Network::Bitcoin),
                platform("Gamma", &["gamma.io"], Network::Bitcoin),
            ],

            network_keywords: vec![
                NetworkKeyword { keyword: "ethereum".to_string(), network: Network::Ethereum },
                NetworkKeyword { keyword: "bitcoin".to_string(), network: Network::Bitcoin },
                NetworkKeyword { keyword: "solana".to_string(), network: Network::Solana },
            ],

            content_date_fields: vec![
                "published".to_string(),
                "created".to_string(),
                "minted".to_string(),
                "uploaded".to_string(),
            ],

            iso_timestamp: r"\b(\d{4}-\d{2}-\d{2})T(\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?)(Z|[+-]\d{2}:?\d{2})?".to_string(),

            frontmatter_date_fields: vec![
                "minted_date".to_string(),
                "published_date".to_string(),
                "scraped_date".to_string(),
                "upload_date".to_string(),
            ],
        }
    }
}

// ============================================================================
// COMPILED LIBRARY
// ============================================================================

#[derive(Debug)]
pub struct CompiledExplorer {
    pub name: String,
    pub regex: Regex,
    pub network: Network,
}

#[derive(Debug)]
pub struct PatternLibrary {
    definition: PatternDefinition,
    fingerprint: String,

    pub(crate) ethereum: Regex,
    pub(crate) bitcoin: Regex,
    pub(crate) solana: Regex,
    pub(crate) ipfs: Regex,
    pub(crate) token_ids: Vec<Regex>,
    pub(crate) explorers: Vec<CompiledExplorer>,
    pub(crate) content_dates: Vec<(String, Regex)>,
    pub(crate) iso_timestamp: Regex,

    /// Lowercased platform keywords, parallel to definition.platforms
    platform_keywords: Vec<Vec<String>>,
}

fn compile(label: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("Invalid {} pattern: {}", label, pattern))
}

impl PatternLibrary {
    /// Compile a definition into a ready-to-use library
    pub fn from_definition(definition: PatternDefinition) -> Result<Self> {
        let token_ids = definition
            .token_id_patterns
            .iter()
            .map(|p| compile("token id", p))
            .collect::<Result<Vec<_>>>()?;

        let explorers = definition
            .explorers
            .iter()
            .map(|e| {
                Ok(CompiledExplorer {
                    name: e.name.clone(),
                    regex: compile(&e.name, &e.pattern)?,
                    network: e.network,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let content_dates = definition
            .content_date_fields
            .iter()
            .map(|field| {
                let pattern = format!(r"(?i)\b{}:\s*(\d{{4}}-\d{{2}}-\d{{2}})", regex::escape(field));
                Ok((field.clone(), compile("content date", &pattern)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let platform_keywords = definition
            .platforms
            .iter()
            .map(|p| p.keywords.iter().map(|k| k.to_lowercase()).collect())
            .collect();

        let serialized = serde_json::to_string(&definition).context("Failed to serialize pattern definition")?;
        let fingerprint = format!("{:x}", Sha256::digest(serialized.as_bytes()));

        Ok(PatternLibrary {
            ethereum: compile("ethereum", &definition.ethereum_address)?,
            bitcoin: compile("bitcoin", &definition.bitcoin_address)?,
            solana: compile("solana", &definition.solana_address)?,
            ipfs: compile("ipfs", &definition.ipfs_hash)?,
            iso_timestamp: compile("iso timestamp", &definition.iso_timestamp)?,
            token_ids,
            explorers,
            content_dates,
            platform_keywords,
            fingerprint,
            definition,
        })
    }

    /// Built-in patterns
    pub fn with_defaults() -> Self {
        Self::from_definition(PatternDefinition::default())
            .expect("built-in pattern library must compile")
    }

    /// Load a pattern definition from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read patterns file: {:?}", path.as_ref()))?;

        let definition: PatternDefinition = serde_json::from_str(&content)
            .context("Failed to parse patterns JSON")?;

        Self::from_definition(definition)
    }

    pub fn version(&self) -> &str {
        &self.definition.version
    }

    /// SHA-256 of the definition; changes whenever any pattern changes
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn definition(&self) -> &PatternDefinition {
        &self.definition
    }

    pub fn solana_guard_keyword(&self) -> &str {
        &self.definition.solana_guard_keyword
    }

    pub fn platforms(&self) -> impl Iterator<Item = (&PlatformEntry, &[String])> {
        self.definition
            .platforms
            .iter()
            .zip(self.platform_keywords.iter().map(|k| k.as_slice()))
    }

    /// Network implied by a platform label
    pub fn platform_network(&self, name: &str) -> Option<Network> {
        self.definition
            .platforms
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.network)
    }

    pub fn network_keywords(&self) -> &[NetworkKeyword] {
        &self.definition.network_keywords
    }

    pub fn frontmatter_date_fields(&self) -> &[String] {
        &self.definition.frontmatter_date_fields
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// TESTS
// ============================================================================
