//! Per-database aggregation.
//!
//! Enumerates a database's user collections, inspects each one, and rolls
//! the results into a database snapshot. Summary counters accumulate
//! incrementally as each collection completes, so a failed inspection
//! leaves all prior sums intact.

use crate::error::Result;
use crate::inspect::inspect_collection;
use crate::models::{DatabaseSnapshot, DatabaseStats, SampleBatch, is_system_collection};
use crate::walk::{SampleSink, WalkMode, WalkOptions};
use mongodb::Client;
use mongodb::bson::doc;
use mongodb::results::DatabaseSpecification;

/// Aggregates one database into a snapshot.
///
/// The only error this propagates is a sink write failure: once the output
/// stream is broken no valid export can be produced. Every database-side
/// failure is logged and degrades to defaults.
pub async fn aggregate_database<S: SampleSink>(
    client: &Client,
    spec: &DatabaseSpecification,
    options: &WalkOptions,
    sink: &mut S,
) -> Result<DatabaseSnapshot> {
    let mut snapshot = DatabaseSnapshot::new(&spec.name, spec.size_on_disk, spec.empty);

    tracing::info!("Processing database: {}", spec.name);

    if options.mode == WalkMode::FullMetadata {
        match fetch_database_stats(client, &spec.name).await {
            Ok(stats) => snapshot.stats = stats,
            Err(e) => {
                tracing::warn!("Could not get stats for database {}: {}", spec.name, e);
            }
        }
    }

    let collections = match client
        .database(&spec.name)
        .list_collection_names()
        .await
    {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(
                "Could not list collections in database {}: {}",
                spec.name,
                e
            );
            return Ok(snapshot);
        }
    };

    // Server-reported order is preserved; only system collections are
    // filtered out.
    for name in collections {
        if is_system_collection(&name) {
            tracing::trace!("Skipping system collection: {}.{}", spec.name, name);
            continue;
        }

        tracing::debug!("Processing collection: {}.{}", spec.name, name);

        let outcome = match tokio::time::timeout(
            options.collection_timeout,
            inspect_collection(client, &spec.name, &name, options.mode, options.sample_size),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    "Inspection of {}.{} exceeded {:?}, recording defaults",
                    spec.name,
                    name,
                    options.collection_timeout
                );
                crate::inspect::InspectOutcome {
                    snapshot: crate::models::CollectionSnapshot::new(&spec.name, &name),
                    samples: Vec::new(),
                }
            }
        };

        snapshot.summary.absorb_collection(&outcome.snapshot);

        if options.mode == WalkMode::SampleData {
            sink.emit_batch(SampleBatch {
                database: spec.name.clone(),
                collection: name,
                documents: outcome.samples,
            })?;
        }

        snapshot.collections.push(outcome.snapshot);
    }

    Ok(snapshot)
}

/// Runs `dbStats` and extracts the tracked numeric fields.
async fn fetch_database_stats(client: &Client, database: &str) -> Result<DatabaseStats> {
    let reply = client
        .database(database)
        .run_command(doc! { "dbStats": 1 })
        .await
        .map_err(|e| {
            crate::error::CensusError::collection_failed(
                format!("Failed to get database stats for '{}'", database),
                e,
            )
        })?;

    Ok(DatabaseStats::from_document(&reply))
}
