// 🏷️ Document Classifier - url/content/frontmatter → derived fields
// Pure per-document function; batches run on the rayon pool.

use crate::dates::DateResolver;
use crate::document::{ClassificationNote, ClassifiedDocument, Document, Network, NetworkEvidence, NoteKind};
use crate::extractor::AddressExtractor;
use crate::network::NetworkClassifier;
use crate::patterns::PatternLibrary;
use crate::platform::{platform_slug, PlatformInferrer};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

pub struct DocumentClassifier<'a> {
    patterns: &'a PatternLibrary,
}

impl<'a> DocumentClassifier<'a> {
    pub fn new(patterns: &'a PatternLibrary) -> Self {
        DocumentClassifier { patterns }
    }

    /// Recompute every derived field for one document
    pub fn classify(&self, doc: &Document) -> ClassifiedDocument {
        let extractor = AddressExtractor::new(self.patterns);
        let inferrer = PlatformInferrer::new(self.patterns);

        let addresses = extractor.extract(&doc.url, &doc.content);
        let ipfs_hashes = extractor.ipfs_hashes(&doc.url, &doc.content);
        let token_ids = extractor.token_ids(&doc.url, &doc.content);
        let platforms = inferrer.infer(&doc.url, &doc.content);

        let (network, network_evidence) = NetworkClassifier::new(self.patterns).classify(
            &addresses,
            &inferrer.implied_networks(&platforms),
            &doc.content,
        );

        let resolution = DateResolver::new(self.patterns).resolve(&doc.content, &doc.frontmatter, doc.created_at);
        let mut notes = resolution.notes;

        match network_evidence {
            NetworkEvidence::AmbiguousAddresses => notes.push(ClassificationNote::new(
                NoteKind::AmbiguousNetwork,
                "Addresses tie across networks; classified as unknown",
            )),
            NetworkEvidence::AmbiguousPlatforms => notes.push(ClassificationNote::new(
                NoteKind::AmbiguousNetwork,
                "Platforms imply different networks; classified as unknown",
            )),
            NetworkEvidence::NoEvidence if addresses.is_empty() && platforms.is_empty() => notes.push(
                ClassificationNote::new(NoteKind::Unclassified, "No address, platform or network keyword found"),
            ),
            _ => {}
        }

        let tags = derive_tags(doc, network, !addresses.is_empty(), &platforms, &ipfs_hashes);

        debug!(
            "Classified {}: network={} addresses={} platforms={}",
            doc.id,
            network,
            addresses.len(),
            platforms.len()
        );

        ClassifiedDocument {
            title: doc.title(),
            document: doc.clone(),
            addresses,
            network,
            network_evidence,
            platforms,
            ipfs_hashes,
            token_ids,
            original_date: resolution.date,
            tags,
            notes,
        }
    }

    /// Classify a batch in parallel; output order matches input order
    pub fn classify_all(&self, documents: &[Document]) -> Vec<ClassifiedDocument> {
        documents.par_iter().map(|doc| self.classify(doc)).collect()
    }
}

fn derive_tags(
    doc: &Document,
    network: Network,
    has_addresses: bool,
    platforms: &BTreeSet<String>,
    ipfs_hashes: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut tags: BTreeSet<String> = doc.frontmatter_tags().into_iter().collect();

    if network.is_known() || has_addresses || !platforms.is_empty() {
        tags.insert("blockchain".to_string());
    }
    if network.is_known() {
        tags.insert(network.as_str().to_string());
    }
    tags.extend(platforms.iter().map(|p| platform_slug(p)));
    if !ipfs_hashes.is_empty() {
        tags.insert("ipfs".to_string());
    }

    tags
}

// ============================================================================
// TESTS
// ============================================================================
