//! Sample-data export mode.
//!
//! Emits one self-delimited block per non-empty collection so a simple
//! line-oriented post-processor can split the stream back into one file
//! per collection. The block structure is a committed wire format:
//!
//! ```text
//! __FILE_START__:{output_dir}/{db}_{collection}_sample.json
//! {extended JSON document}
//! ...
//! __FILE_END__
//! # Metadata: database={db}, collection={collection}, sample_size={n}
//! ```
//!
//! Empty collections emit no block and are counted as skipped.

use crate::ejson::encode_document;
use crate::error::{CensusError, Result};
use crate::models::SampleBatch;
use crate::walk::{SampleSink, WalkMode, WalkOptions, walk};
use mongodb::Client;
use std::io::Write;

/// Start-of-block marker; the target filename follows the colon.
pub const FILE_START_MARKER: &str = "__FILE_START__:";

/// End-of-block marker.
pub const FILE_END_MARKER: &str = "__FILE_END__";

/// Counters accumulated over one sample-data run.
#[derive(Debug, Clone, Default)]
pub struct SampleRunStats {
    /// Collections visited, including skipped ones.
    pub collections: u64,
    /// Documents emitted across all blocks.
    pub documents: u64,
    /// Collections with zero documents (no block emitted).
    pub skipped: u64,
    /// Documents that degraded to a best-effort plain encoding.
    pub partial_documents: u64,
}

/// Streams sample blocks to a writer and tracks run statistics.
pub struct SampleStreamWriter<W: Write> {
    out: W,
    output_dir: String,
    stats: SampleRunStats,
}

impl<W: Write> SampleStreamWriter<W> {
    /// Creates a writer targeting `output_dir` in the block markers.
    /// No directory is created; the identifier only names the file a
    /// post-processor should produce.
    pub fn new(out: W, output_dir: impl Into<String>) -> Self {
        Self {
            out,
            output_dir: output_dir.into(),
            stats: SampleRunStats::default(),
        }
    }

    /// Run statistics accumulated so far.
    pub fn stats(&self) -> &SampleRunStats {
        &self.stats
    }

    /// Consumes the writer and returns the final run statistics.
    pub fn into_stats(self) -> SampleRunStats {
        self.stats
    }

    /// Consumes the writer and returns the statistics alongside the
    /// underlying output.
    pub fn into_parts(self) -> (SampleRunStats, W) {
        (self.stats, self.out)
    }
}

impl<W: Write> SampleSink for SampleStreamWriter<W> {
    fn emit_batch(&mut self, batch: SampleBatch) -> Result<()> {
        self.stats.collections += 1;

        if batch.documents.is_empty() {
            tracing::info!(
                "No documents found in {}.{}, skipping",
                batch.database,
                batch.collection
            );
            self.stats.skipped += 1;
            return Ok(());
        }

        let sample_size = batch.documents.len() as u64;

        writeln!(
            self.out,
            "{}{}/{}_{}_sample.json",
            FILE_START_MARKER, self.output_dir, batch.database, batch.collection
        )
        .map_err(write_err)?;

        for doc in &batch.documents {
            let encoded = encode_document(doc)?;
            if encoded.partial_encoding {
                tracing::warn!(
                    "Document in {}.{} contains values without a strict encoding, \
                     emitted best-effort",
                    batch.database,
                    batch.collection
                );
                self.stats.partial_documents += 1;
            }
            writeln!(self.out, "{}", encoded.text).map_err(write_err)?;
        }

        writeln!(self.out, "{}", FILE_END_MARKER).map_err(write_err)?;
        writeln!(
            self.out,
            "# Metadata: database={}, collection={}, sample_size={}",
            batch.database, batch.collection, sample_size
        )
        .map_err(write_err)?;

        self.stats.documents += sample_size;

        tracing::info!(
            "Sampled {} documents from {}.{}",
            sample_size,
            batch.database,
            batch.collection
        );

        Ok(())
    }
}

/// Walks the cluster in sampling mode, streaming blocks to `out`.
pub async fn export_samples<W: Write>(
    client: &Client,
    sample_size: u32,
    output_dir: &str,
    out: W,
) -> Result<SampleRunStats> {
    let options = WalkOptions::new(WalkMode::SampleData).with_sample_size(sample_size);
    let mut writer = SampleStreamWriter::new(out, output_dir);

    let snapshot = walk(client, &options, &mut writer).await?;

    let stats = writer.into_stats();
    tracing::info!(
        "Sample collection complete: {} databases, {} collections ({} skipped), {} documents",
        snapshot.summary.total_databases,
        stats.collections,
        stats.skipped,
        stats.documents
    );

    Ok(stats)
}

fn write_err(e: std::io::Error) -> CensusError {
    CensusError::Io {
        context: "Failed to write sample block".to_string(),
        source: e,
    }
}
