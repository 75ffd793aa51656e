//! Cluster walker.
//!
//! The walk is a single linear pass: each user database is visited exactly
//! once, each collection within it exactly once, in server-reported order.
//! There is no retry and no concurrent fan-out; summary counters accumulate
//! monotonically as each level completes.

use crate::aggregate::aggregate_database;
use crate::error::Result;
use crate::models::{
    BuildInfo, ClusterSnapshot, SampleBatch, ServerFacts, ServerStatus, is_system_database,
};
use mongodb::Client;
use mongodb::bson::doc;
use std::time::Duration;

/// Default number of documents sampled per collection.
pub const DEFAULT_SAMPLE_SIZE: u32 = 10;

/// Default deadline for inspecting a single collection.
pub const DEFAULT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// What the walk requests from each collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Indexes only; stats and sampling are skipped for performance.
    IndexesOnly,
    /// Stats and indexes; no sampling.
    FullMetadata,
    /// Document sampling only.
    SampleData,
}

/// Configuration for one walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub mode: WalkMode,
    /// Documents drawn per collection in sampling mode.
    pub sample_size: u32,
    /// Deadline for one collection inspection. A hung server operation is
    /// treated as a per-collection failure rather than blocking the walk.
    pub collection_timeout: Duration,
}

impl WalkOptions {
    /// Creates options for the given mode with default sample size and
    /// per-collection deadline.
    pub fn new(mode: WalkMode) -> Self {
        Self {
            mode,
            sample_size: DEFAULT_SAMPLE_SIZE,
            collection_timeout: DEFAULT_COLLECTION_TIMEOUT,
        }
    }

    /// Builder method to set the per-collection sample size.
    pub fn with_sample_size(mut self, size: u32) -> Self {
        self.sample_size = size;
        self
    }

    /// Builder method to set the per-collection inspection deadline.
    pub fn with_collection_timeout(mut self, timeout: Duration) -> Self {
        self.collection_timeout = timeout;
        self
    }
}

/// Receives sampled documents as the walk streams them, one batch per
/// inspected collection. Batches for empty collections are delivered too
/// so the sink can count skips.
pub trait SampleSink {
    /// Handles one collection's sample batch.
    fn emit_batch(&mut self, batch: SampleBatch) -> Result<()>;
}

/// Sink for walks that do not sample.
#[derive(Debug, Default)]
pub struct NoopSink;

impl SampleSink for NoopSink {
    fn emit_batch(&mut self, _batch: SampleBatch) -> Result<()> {
        Ok(())
    }
}

/// Walks the cluster and produces a complete snapshot.
///
/// Every database-side failure degrades to zero-value defaults, so the
/// walk always completes and the emitters always have a syntactically
/// valid snapshot to write. Even a database enumeration failure yields an
/// empty snapshot rather than an error; only sink write failures
/// propagate.
pub async fn walk<S: SampleSink>(
    client: &Client,
    options: &WalkOptions,
    sink: &mut S,
) -> Result<ClusterSnapshot> {
    let mut snapshot = ClusterSnapshot::new();

    // Server facts are only needed by the full-metadata export; the other
    // modes never touch the admin database beyond listDatabases.
    if options.mode == WalkMode::FullMetadata {
        snapshot.server = fetch_server_facts(client).await;
    }

    let databases = match client.list_databases().await {
        Ok(databases) => databases,
        Err(e) => {
            tracing::error!("Failed to enumerate databases: {}", e);
            return Ok(snapshot);
        }
    };

    tracing::info!("Found {} databases on the cluster", databases.len());

    for spec in &databases {
        if is_system_database(&spec.name) {
            tracing::trace!("Skipping system database: {}", spec.name);
            continue;
        }

        let db_snapshot = aggregate_database(client, spec, options, sink).await?;
        tracing::info!(
            "Completed database {}: {} collections, {} indexes",
            db_snapshot.name,
            db_snapshot.summary.total_collections,
            db_snapshot.summary.total_indexes
        );

        snapshot.summary.absorb_database(&db_snapshot);
        snapshot.databases.push(db_snapshot);
    }

    Ok(snapshot)
}

/// Fetches server build, status, and storage-engine facts once.
///
/// Best-effort: any failure here leaves the corresponding fields absent
/// and never interrupts the traversal.
async fn fetch_server_facts(client: &Client) -> ServerFacts {
    let admin = client.database("admin");
    let mut facts = ServerFacts::default();

    match admin.run_command(doc! { "buildInfo": 1 }).await {
        Ok(reply) => {
            let build_info = BuildInfo::from_document(&reply);
            facts.version = build_info.version.clone();
            facts.build_info = Some(build_info);
        }
        Err(e) => tracing::warn!("Could not retrieve server build info: {}", e),
    }

    match admin.run_command(doc! { "serverStatus": 1 }).await {
        Ok(reply) => {
            facts.storage_engine = reply
                .get_document("storageEngine")
                .ok()
                .and_then(|engine| engine.get_str("name").ok())
                .map(str::to_string);
            facts.server_status = Some(ServerStatus::from_document(&reply));
        }
        Err(e) => tracing::warn!("Could not retrieve server status: {}", e),
    }

    tracing::info!(
        "MongoDB version: {}, storage engine: {}",
        facts.version.as_deref().unwrap_or("unknown"),
        facts.storage_engine.as_deref().unwrap_or("unknown")
    );

    facts
}
