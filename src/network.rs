// 🌐 Network Classifier - One primary network per document
//
// Rule order (first rule with a result wins):
// 1. addresses on exactly one network
// 2. addresses on several networks → most addresses wins, tie → unknown
// 3. platform-implied network (same majority / tie policy)
// 4. first network keyword in content
// 5. unknown
//
// A tie is never broken by guessing.

use crate::document::{BlockchainAddress, Network, NetworkEvidence};
use crate::patterns::PatternLibrary;
use std::collections::BTreeMap;

pub struct NetworkClassifier<'a> {
    patterns: &'a PatternLibrary,
}

enum Tally {
    Empty,
    Single(Network),
    Majority(Network),
    Tie,
}

fn tally(networks: impl Iterator<Item = Network>) -> Tally {
    let mut counts: BTreeMap<Network, usize> = BTreeMap::new();
    for network in networks.filter(Network::is_known) {
        *counts.entry(network).or_insert(0) += 1;
    }

    match counts.len() {
        0 => Tally::Empty,
        1 => counts
            .into_keys()
            .next()
            .map(Tally::Single)
            .unwrap_or(Tally::Empty),
        _ => {
            let best = counts.values().copied().max().unwrap_or(0);
            let leaders: Vec<Network> = counts
                .iter()
                .filter(|(_, count)| **count == best)
                .map(|(network, _)| *network)
                .collect();
            if leaders.len() == 1 {
                Tally::Majority(leaders[0])
            } else {
                Tally::Tie
            }
        }
    }
}

impl<'a> NetworkClassifier<'a> {
    pub fn new(patterns: &'a PatternLibrary) -> Self {
        NetworkClassifier { patterns }
    }

    pub fn classify(
        &self,
        addresses: &[BlockchainAddress],
        platform_networks: &[Network],
        content: &str,
    ) -> (Network, NetworkEvidence) {
        match tally(addresses.iter().map(|a| a.network)) {
            Tally::Single(network) => return (network, NetworkEvidence::SingleNetworkAddresses),
            Tally::Majority(network) => return (network, NetworkEvidence::MajorityAddresses),
            Tally::Tie => return (Network::Unknown, NetworkEvidence::AmbiguousAddresses),
            Tally::Empty => {}
        }

        match tally(platform_networks.iter().copied()) {
            Tally::Single(network) | Tally::Majority(network) => {
                return (network, NetworkEvidence::PlatformImplied)
            }
            Tally::Tie => return (Network::Unknown, NetworkEvidence::AmbiguousPlatforms),
            Tally::Empty => {}
        }

        if let Some(network) = self.first_keyword(content) {
            return (network, NetworkEvidence::ContentKeyword);
        }

        (Network::Unknown, NetworkEvidence::NoEvidence)
    }

    /// Network whose keyword occurs earliest in content
    fn first_keyword(&self, content: &str) -> Option<Network> {
        let content = content.to_lowercase();
        self.patterns
            .network_keywords()
            .iter()
            .filter_map(|k| {
                content
                    .find(&k.keyword.to_lowercase())
                    .map(|pos| (pos, k.network))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, network)| network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(network: Network, address: &str) -> BlockchainAddress {
        BlockchainAddress::new(network, address)
    }

    fn classify(addresses: &[BlockchainAddress], platforms: &[Network], content: &str) -> (Network, NetworkEvidence) {
        let patterns = PatternLibrary::with_defaults();
        NetworkClassifier::new(&patterns).classify(addresses, platforms, content)
    }

    #[test]
    fn test_single_network() {
        let result = classify(&[addr(Network::Bitcoin, "1a"), addr(Network::Bitcoin, "1b")], &[], "");
        assert_eq!(result, (Network::Bitcoin, NetworkEvidence::SingleNetworkAddresses));
    }

    #[test]
    fn test_majority_wins() {
        let addresses = [
            addr(Network::Ethereum, "0xa"),
            addr(Network::Ethereum, "0xb"),
            addr(Network::Solana, "s1"),
        ];
        let result = classify(&addresses, &[Network::Solana], "solana");
        assert_eq!(result, (Network::Ethereum, NetworkEvidence::MajorityAddresses));
    }

    #[test]
    fn test_tie_is_unknown() {
        let addresses = [addr(Network::Ethereum, "0xa"), addr(Network::Bitcoin, "1a")];
        // Platform and keyword evidence must not break the tie
        let result = classify(&addresses, &[Network::Ethereum], "ethereum");
        assert_eq!(result, (Network::Unknown, NetworkEvidence::AmbiguousAddresses));
    }

    #[test]
    fn test_platform_fallback() {
        let result = classify(&[], &[Network::Solana], "ethereum mentioned");
        assert_eq!(result, (Network::Solana, NetworkEvidence::PlatformImplied));
    }

    #[test]
    fn test_conflicting_platforms_are_ambiguous() {
        let result = classify(&[], &[Network::Solana, Network::Ethereum], "");
        assert_eq!(result, (Network::Unknown, NetworkEvidence::AmbiguousPlatforms));
    }

    #[test]
    fn test_first_keyword_wins() {
        let result = classify(&[], &[], "Bridged from Solana to Ethereum");
        assert_eq!(result, (Network::Solana, NetworkEvidence::ContentKeyword));
    }

    #[test]
    fn test_no_evidence() {
        let result = classify(&[], &[], "a painting");
        assert_eq!(result, (Network::Unknown, NetworkEvidence::NoEvidence));
    }
}
