//! Index-flat export mode.
//!
//! Runs the walk requesting indexes only, then flattens every index record
//! into one ordered sequence (database, then collection, then index
//! definition order), discarding the snapshot hierarchy.

use crate::error::{CensusError, Result};
use crate::models::{ClusterSnapshot, IndexRecord, SOURCE_NAME};
use crate::walk::{NoopSink, WalkMode, WalkOptions, walk};
use chrono::{DateTime, Utc};
use mongodb::Client;
use serde::Serialize;
use std::io::Write;

/// Envelope for the index-flat output document.
#[derive(Debug, Serialize)]
pub struct IndexExport {
    pub metadata: ExportMetadata,
    pub options: serde_json::Value,
    pub indexes: Vec<IndexRecord>,
}

/// Provenance stamp for an export document.
#[derive(Debug, Serialize)]
pub struct ExportMetadata {
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Flattens a snapshot into the index-flat envelope.
pub fn build_index_export(snapshot: &ClusterSnapshot) -> IndexExport {
    let indexes = snapshot
        .databases
        .iter()
        .flat_map(|db| db.collections.iter())
        .flat_map(|coll| coll.indexes.iter().cloned())
        .collect();

    IndexExport {
        metadata: ExportMetadata {
            timestamp: snapshot.timestamp,
            source: SOURCE_NAME.to_string(),
        },
        options: serde_json::json!({}),
        indexes,
    }
}

/// Walks the cluster in indexes-only mode and writes the flat export as
/// one pretty-printed JSON document.
pub async fn export_indexes<W: Write>(client: &Client, out: &mut W) -> Result<IndexExport> {
    let options = WalkOptions::new(WalkMode::IndexesOnly);
    let snapshot = walk(client, &options, &mut NoopSink).await?;

    let export = build_index_export(&snapshot);

    serde_json::to_writer_pretty(&mut *out, &export)
        .map_err(|e| CensusError::serialization("Index export serialization", e))?;
    writeln!(out).map_err(|e| CensusError::Io {
        context: "Failed to write index export".to_string(),
        source: e,
    })?;

    Ok(export)
}
