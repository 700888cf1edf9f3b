// 🗂️ Address Index - Inverted index address → documents
// Keys and their document lists keep first-seen order; no duplicates.

use crate::document::{BlockchainAddress, ClassifiedDocument, Network};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressIndexEntry {
    pub address: String,
    pub network: Network,
    pub document_ids: Vec<String>,
}

impl AddressIndexEntry {
    pub fn document_count(&self) -> usize {
        self.document_ids.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddressIndex {
    entries: Vec<AddressIndexEntry>,
    positions: HashMap<BlockchainAddress, usize>,
    by_address: HashMap<String, Vec<usize>>,
    indexed_documents: HashSet<String>,
}

impl AddressIndex {
    pub fn new() -> Self {
        AddressIndex::default()
    }

    /// Index every document in order
    pub fn build(documents: &[ClassifiedDocument]) -> Self {
        let mut index = AddressIndex::new();
        for doc in documents {
            index.add_document(doc);
        }
        index
    }

    /// Append a document id under each of its (network, address) keys.
    /// A document already indexed is ignored.
    pub fn add_document(&mut self, doc: &ClassifiedDocument) {
        if !self.indexed_documents.insert(doc.id().to_string()) {
            return;
        }

        for key in &doc.addresses {
            let position = match self.positions.get(key) {
                Some(&position) => position,
                None => {
                    let position = self.entries.len();
                    self.entries.push(AddressIndexEntry {
                        address: key.address.clone(),
                        network: key.network,
                        document_ids: Vec::new(),
                    });
                    self.positions.insert(key.clone(), position);
                    self.by_address
                        .entry(key.address.clone())
                        .or_default()
                        .push(position);
                    position
                }
            };

            let ids = &mut self.entries[position].document_ids;
            if ids.last().map(String::as_str) != Some(doc.id()) {
                ids.push(doc.id().to_string());
            }
        }
    }

    /// Drop a document id everywhere; keys left empty disappear
    pub fn remove_document(&mut self, id: &str) -> bool {
        if !self.indexed_documents.remove(id) {
            return false;
        }

        let mut entries = std::mem::take(&mut self.entries);
        for entry in &mut entries {
            entry.document_ids.retain(|doc_id| doc_id != id);
        }
        entries.retain(|entry| !entry.document_ids.is_empty());

        self.entries = entries;
        self.reindex_positions();
        true
    }

    fn reindex_positions(&mut self) {
        self.positions.clear();
        self.by_address.clear();
        for (position, entry) in self.entries.iter().enumerate() {
            self.positions
                .insert(BlockchainAddress { network: entry.network, address: entry.address.clone() }, position);
            self.by_address
                .entry(entry.address.clone())
                .or_default()
                .push(position);
        }
    }

    /// Entries for a literal address on any network.
    /// 0x-hex input is lowercased to match the stored ethereum form.
    pub fn lookup(&self, address: &str) -> Vec<&AddressIndexEntry> {
        let key = normalize_query(address);
        self.by_address
            .get(&key)
            .map(|positions| positions.iter().map(|&p| &self.entries[p]).collect())
            .unwrap_or_default()
    }

    /// Exact (network, address) entry
    pub fn get(&self, key: &BlockchainAddress) -> Option<&AddressIndexEntry> {
        self.positions.get(key).map(|&p| &self.entries[p])
    }

    /// Document ids for an address across networks, first-seen order
    pub fn document_ids(&self, address: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.lookup(address)
            .into_iter()
            .flat_map(|entry| entry.document_ids.iter())
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> &[AddressIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One page of keys in first-seen order
    pub fn page(&self, offset: usize, limit: usize) -> &[AddressIndexEntry] {
        let start = offset.min(self.entries.len());
        let end = start.saturating_add(limit).min(self.entries.len());
        &self.entries[start..end]
    }

    /// Every key with its document count
    pub fn key_counts(&self) -> Vec<(&str, Network, usize)> {
        self.entries
            .iter()
            .map(|e| (e.address.as_str(), e.network, e.document_count()))
            .collect()
    }

    pub fn grouped_by_network(&self) -> BTreeMap<Network, Vec<&AddressIndexEntry>> {
        let mut groups: BTreeMap<Network, Vec<&AddressIndexEntry>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(entry.network).or_default().push(entry);
        }
        groups
    }
}

fn normalize_query(address: &str) -> String {
    let address = address.trim();
    if address.len() == 42 && (address.starts_with("0x") || address.starts_with("0X")) {
        Network::Ethereum.normalize_address(&format!("0x{}", &address[2..]))
    } else {
        address.to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================
