// 🏪 Platform Inferrer - Marketplace labels from keyword/domain hits

use crate::document::Network;
use crate::patterns::PatternLibrary;
use std::collections::BTreeSet;

pub struct PlatformInferrer<'a> {
    patterns: &'a PatternLibrary,
}

impl<'a> PlatformInferrer<'a> {
    pub fn new(patterns: &'a PatternLibrary) -> Self {
        PlatformInferrer { patterns }
    }

    /// Every platform whose keyword appears in url or content (case-insensitive)
    pub fn infer(&self, url: &str, content: &str) -> BTreeSet<String> {
        let url = url.to_lowercase();
        let content = content.to_lowercase();

        self.patterns
            .platforms()
            .filter(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|k| url.contains(k.as_str()) || content.contains(k.as_str()))
            })
            .map(|(entry, _)| entry.name.clone())
            .collect()
    }

    /// Implied network per platform label, in label order
    pub fn implied_networks(&self, platforms: &BTreeSet<String>) -> Vec<Network> {
        platforms
            .iter()
            .filter_map(|name| self.patterns.platform_network(name))
            .collect()
    }
}

/// Lowercase slug used for tags ("1stDibs NFT" → "1stdibs-nft")
pub fn platform_slug(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
