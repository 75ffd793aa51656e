//! Full-metadata export mode.
//!
//! Emits the complete cluster snapshot as one JSON document, then a
//! human-readable summary to a separate writer. The two streams must never
//! be interleaved: consumers parse the structured stream as a single JSON
//! value.

use crate::error::{CensusError, Result};
use crate::models::ClusterSnapshot;
use crate::walk::{NoopSink, WalkMode, WalkOptions, walk};
use mongodb::Client;
use std::io::Write;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Walks the cluster in full-metadata mode, writes the snapshot to `out`
/// and the human-readable summary to `summary_out`.
pub async fn export_metadata<W: Write, H: Write>(
    client: &Client,
    out: &mut W,
    summary_out: &mut H,
) -> Result<ClusterSnapshot> {
    let options = WalkOptions::new(WalkMode::FullMetadata);
    let snapshot = walk(client, &options, &mut NoopSink).await?;

    serde_json::to_writer_pretty(&mut *out, &snapshot)
        .map_err(|e| CensusError::serialization("Metadata export serialization", e))?;
    writeln!(out).map_err(write_err)?;

    write_summary(&snapshot, summary_out)?;

    Ok(snapshot)
}

/// Writes the human-readable run summary: entity counts, aggregate sizes
/// converted to MB, and one line per database.
///
/// This is the only place byte counts are converted to MB; the structured
/// JSON always carries raw byte counts.
pub fn write_summary<W: Write>(snapshot: &ClusterSnapshot, out: &mut W) -> Result<()> {
    let summary = &snapshot.summary;

    writeln!(out, "\nMetadata Collection Summary:").map_err(write_err)?;
    writeln!(
        out,
        "MongoDB version: {}",
        snapshot.server.version.as_deref().unwrap_or("unknown")
    )
    .map_err(write_err)?;
    writeln!(
        out,
        "Storage engine: {}",
        snapshot
            .server
            .storage_engine
            .as_deref()
            .unwrap_or("unknown")
    )
    .map_err(write_err)?;
    writeln!(out, "Processed {} databases", summary.total_databases).map_err(write_err)?;
    writeln!(out, "Processed {} collections", summary.total_collections).map_err(write_err)?;
    writeln!(out, "Found {} total indexes", summary.total_indexes).map_err(write_err)?;
    writeln!(out, "Total size: {:.2} MB", to_mb(summary.total_size)).map_err(write_err)?;
    writeln!(
        out,
        "Total data size: {:.2} MB",
        to_mb(summary.total_data_size)
    )
    .map_err(write_err)?;
    writeln!(
        out,
        "Total storage size: {:.2} MB",
        to_mb(summary.total_storage_size)
    )
    .map_err(write_err)?;

    writeln!(out, "\nDatabase Summary:").map_err(write_err)?;
    for db in &snapshot.databases {
        writeln!(
            out,
            "- {}: {} collections, {} indexes, {:.2} MB",
            db.name,
            db.summary.total_collections,
            db.summary.total_indexes,
            to_mb(db.stats.total_size.unwrap_or(0))
        )
        .map_err(write_err)?;
    }

    Ok(())
}

fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

fn write_err(e: std::io::Error) -> CensusError {
    CensusError::Io {
        context: "Failed to write metadata summary".to_string(),
        source: e,
    }
}
