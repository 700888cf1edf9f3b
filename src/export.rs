// 📤 CSV Export - edge list + node table for the graph visualization

use crate::snapshot::GraphSnapshot;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct EdgeRow<'a> {
    source: &'a str,
    target: &'a str,
    #[serde(rename = "type")]
    relationship_type: &'a str,
    strength: f64,
}

#[derive(Debug, Serialize)]
struct NodeRow<'a> {
    id: &'a str,
    title: &'a str,
    network: &'a str,
    /// `;`-joined
    platforms: String,
    original_date: String,
}

pub fn write_edges_csv<W: Write>(snapshot: &GraphSnapshot, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for edge in snapshot.edges() {
        wtr.serialize(EdgeRow {
            source: &edge.source,
            target: &edge.target,
            relationship_type: edge.relationship_type.as_str(),
            strength: edge.strength,
        })?;
    }
    wtr.flush()?;
    Ok(snapshot.edges().len())
}

pub fn write_nodes_csv<W: Write>(snapshot: &GraphSnapshot, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for doc in snapshot.documents() {
        wtr.serialize(NodeRow {
            id: doc.id(),
            title: &doc.title,
            network: doc.network.as_str(),
            platforms: doc.platforms.iter().cloned().collect::<Vec<_>>().join(";"),
            original_date: doc
                .original_date
                .as_ref()
                .map(|d| d.date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        })?;
    }
    wtr.flush()?;
    Ok(snapshot.documents().len())
}

pub fn export_edges_csv(snapshot: &GraphSnapshot, path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create edges CSV: {:?}", path))?;
    write_edges_csv(snapshot, file)
}

pub fn export_nodes_csv(snapshot: &GraphSnapshot, path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create nodes CSV: {:?}", path))?;
    write_nodes_csv(snapshot, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::patterns::PatternLibrary;
    use crate::relationships::{NoSimilarity, RelationshipScorer};

    fn snapshot() -> GraphSnapshot {
        let docs = vec![
            Document::new("a", "https://opensea.io/1", "# First\nminted: 2022-08-15"),
            Document::new("b", "https://opensea.io/2", "# Second, with comma"),
        ];
        GraphSnapshot::build(&docs, &PatternLibrary::with_defaults(), &RelationshipScorer::new(), &NoSimilarity)
    }

    #[test]
    fn test_edges_csv() {
        let mut out = Vec::new();
        let written = write_edges_csv(&snapshot(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(written, 1);
        assert_eq!(text, "source,target,type,strength\na,b,blockchain_platform,0.8\n");
    }

    #[test]
    fn test_nodes_csv_quotes_titles() {
        let mut out = Vec::new();
        write_nodes_csv(&snapshot(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id,title,network,platforms,original_date");
        assert_eq!(lines[1], "a,First,ethereum,OpenSea,2022-08-15");
        assert_eq!(lines[2], "b,\"Second, with comma\",ethereum,OpenSea,");
    }
}
