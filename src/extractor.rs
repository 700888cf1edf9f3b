// 🔎 Address Extractor - Candidate addresses per network
// Explorer links first, then ethereum → bitcoin → solana.
// A substring claimed by an earlier pattern is never re-attributed to a later one.

use crate::document::{BlockchainAddress, Network};
use crate::patterns::PatternLibrary;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

/// Byte ranges of the scanned text already attributed to an address
#[derive(Default)]
struct ClaimedSpans(Vec<Range<usize>>);

impl ClaimedSpans {
    fn overlaps(&self, span: &Range<usize>) -> bool {
        self.0.iter().any(|c| c.start < span.end && span.start < c.end)
    }

    fn claim(&mut self, span: Range<usize>) {
        self.0.push(span);
    }
}

pub struct AddressExtractor<'a> {
    patterns: &'a PatternLibrary,
}

impl<'a> AddressExtractor<'a> {
    pub fn new(patterns: &'a PatternLibrary) -> Self {
        AddressExtractor { patterns }
    }

    /// Ordered (first occurrence, url before content), de-duplicated addresses.
    /// No match is an empty Vec, not an error.
    pub fn extract(&self, url: &str, content: &str) -> Vec<BlockchainAddress> {
        let text = scan_text(url, content);
        let mut claimed = ClaimedSpans::default();
        let mut found: Vec<(usize, BlockchainAddress)> = Vec::new();

        // Explorer links carry their own network, even when nothing else matches
        for explorer in &self.patterns.explorers {
            for caps in explorer.regex.captures_iter(&text) {
                if let Some(m) = caps.get(1) {
                    let span = m.range();
                    if claimed.overlaps(&span) {
                        continue;
                    }
                    claimed.claim(span.clone());
                    found.push((span.start, BlockchainAddress::new(explorer.network, m.as_str())));
                }
            }
        }

        // IPFS hashes are base58 too; keep them out of the address scan
        for m in self.patterns.ipfs.find_iter(&text) {
            claimed.claim(m.range());
        }

        collect_matches(&self.patterns.ethereum, Network::Ethereum, &text, &mut claimed, &mut found);
        collect_matches(&self.patterns.bitcoin, Network::Bitcoin, &text, &mut claimed, &mut found);

        let guard = self.patterns.solana_guard_keyword().to_lowercase();
        if !guard.is_empty() && text.to_lowercase().contains(&guard) {
            collect_matches(&self.patterns.solana, Network::Solana, &text, &mut claimed, &mut found);
        }

        found.sort_by_key(|(pos, _)| *pos);

        let mut seen = HashSet::new();
        found
            .into_iter()
            .filter_map(|(_, address)| {
                if seen.insert(address.clone()) {
                    Some(address)
                } else {
                    None
                }
            })
            .collect()
    }

    /// CIDv0 / CIDv1 hashes anywhere in url or content
    pub fn ipfs_hashes(&self, url: &str, content: &str) -> BTreeSet<String> {
        let text = scan_text(url, content);
        self.patterns
            .ipfs
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Token ids from asset URLs and `Token ID: n` mentions, first-seen order
    pub fn token_ids(&self, url: &str, content: &str) -> Vec<String> {
        let text = scan_text(url, content);
        let mut found: Vec<(usize, String)> = Vec::new();

        for regex in &self.patterns.token_ids {
            for caps in regex.captures_iter(&text) {
                if let Some(m) = caps.get(1) {
                    found.push((m.start(), m.as_str().to_string()));
                }
            }
        }

        found.sort_by_key(|(pos, _)| *pos);

        let mut seen = HashSet::new();
        found
            .into_iter()
            .map(|(_, id)| id)
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }
}

fn scan_text(url: &str, content: &str) -> String {
    format!("{}\n{}", url, content)
}

fn collect_matches(
    regex: &Regex,
    network: Network,
    text: &str,
    claimed: &mut ClaimedSpans,
    found: &mut Vec<(usize, BlockchainAddress)>,
) {
    // Resume after the address, not the whole match, so a single separator
    // character can bound two neighbouring addresses
    let mut start = 0;
    while start <= text.len() {
        let Some(caps) = regex.captures_at(text, start) else { break };
        let Some(whole) = caps.get(0) else { break };
        let m = caps.get(1).unwrap_or(whole);
        if m.end() <= start {
            break;
        }
        start = m.end();

        let span = m.range();
        if claimed.overlaps(&span) {
            continue;
        }
        claimed.claim(span.clone());
        found.push((span.start, BlockchainAddress::new(network, m.as_str())));
    }
}

// ============================================================================
// TESTS
// ============================================================================
