//! Single-collection inspection.
//!
//! Stats retrieval, index retrieval, and sampling are independent
//! operations: a failure in one never prevents the others, and each failure
//! is logged and leaves its sub-record at the zero-value default. The
//! snapshot shape is fixed regardless of partial failure, so inspection
//! itself is infallible by contract.

use crate::error::Result;
use crate::index::normalize_index;
use crate::models::{CollectionSnapshot, CollectionStats, IndexRecord};
use crate::walk::WalkMode;
use mongodb::Client;
use mongodb::bson::{Document, doc};

/// Result of inspecting one collection.
#[derive(Debug)]
pub struct InspectOutcome {
    pub snapshot: CollectionSnapshot,
    /// Sampled documents, populated only in sampling mode. Streamed by the
    /// caller, never retained in the snapshot.
    pub samples: Vec<Document>,
}

/// Inspects one collection according to the walk mode.
pub async fn inspect_collection(
    client: &Client,
    database: &str,
    collection: &str,
    mode: WalkMode,
    sample_size: u32,
) -> InspectOutcome {
    let mut snapshot = CollectionSnapshot::new(database, collection);
    let mut samples = Vec::new();

    if mode == WalkMode::FullMetadata {
        let result = fetch_stats(client, database, collection).await;
        record_stats(&mut snapshot, result);
    }

    if matches!(mode, WalkMode::IndexesOnly | WalkMode::FullMetadata) {
        let result = fetch_indexes(client, database, collection, &snapshot.namespace).await;
        record_indexes(&mut snapshot, result);
    }

    if mode == WalkMode::SampleData {
        match fetch_sample(client, database, collection, sample_size).await {
            Ok(docs) => samples = docs,
            Err(e) => {
                tracing::warn!("Error sampling from {}.{}: {}", database, collection, e);
            }
        }
    }

    InspectOutcome { snapshot, samples }
}

/// Applies a stats retrieval result to the snapshot. A failure leaves the
/// stats record and the derived summary fields at their defaults.
fn record_stats(snapshot: &mut CollectionSnapshot, result: Result<CollectionStats>) {
    match result {
        Ok(stats) => {
            snapshot.summary.apply_stats(&stats);
            snapshot.stats = stats;
        }
        Err(e) => {
            tracing::warn!(
                "Could not get stats for collection {}: {}",
                snapshot.namespace,
                e
            );
        }
    }
}

/// Applies an index retrieval result to the snapshot. A failure leaves the
/// index list empty and the index count at zero.
fn record_indexes(snapshot: &mut CollectionSnapshot, result: Result<Vec<IndexRecord>>) {
    match result {
        Ok(indexes) => {
            snapshot.summary.total_indexes = indexes.len() as u64;
            snapshot.indexes = indexes;
        }
        Err(e) => {
            tracing::warn!(
                "Could not get indexes for collection {}: {}",
                snapshot.namespace,
                e
            );
        }
    }
}

/// Runs `collStats` and extracts the tracked numeric fields.
async fn fetch_stats(
    client: &Client,
    database: &str,
    collection: &str,
) -> Result<CollectionStats> {
    let db = client.database(database);
    let reply = db
        .run_command(doc! { "collStats": collection })
        .await
        .map_err(|e| {
            crate::error::CensusError::collection_failed(
                format!("Failed to get stats for '{}.{}'", database, collection),
                e,
            )
        })?;

    Ok(CollectionStats::from_document(&reply))
}

/// Retrieves raw index descriptors via `listIndexes` and normalizes each.
///
/// The raw cursor command is used instead of the driver's typed index
/// model so the normalizer sees every property the server reports.
async fn fetch_indexes(
    client: &Client,
    database: &str,
    collection: &str,
    namespace: &str,
) -> Result<Vec<IndexRecord>> {
    let db = client.database(database);
    let mut cursor = db
        .run_cursor_command(doc! { "listIndexes": collection })
        .await
        .map_err(|e| {
            crate::error::CensusError::collection_failed(
                format!("Failed to list indexes for '{}'", namespace),
                e,
            )
        })?;

    let mut indexes = Vec::new();
    while cursor.advance().await.map_err(|e| {
        crate::error::CensusError::collection_failed(
            format!("Failed to iterate indexes for '{}'", namespace),
            e,
        )
    })? {
        let raw: Document = cursor.deserialize_current().map_err(|e| {
            crate::error::CensusError::collection_failed(
                format!("Failed to deserialize index for '{}'", namespace),
                e,
            )
        })?;
        indexes.push(normalize_index(&raw, namespace));
    }

    Ok(indexes)
}

/// Draws a uniform random sample via the `$sample` aggregation stage.
///
/// Collections with fewer documents than the sample size return all of
/// them; empty collections return an empty sample.
async fn fetch_sample(
    client: &Client,
    database: &str,
    collection: &str,
    sample_size: u32,
) -> Result<Vec<Document>> {
    let db = client.database(database);
    let coll = db.collection::<Document>(collection);

    let pipeline = vec![doc! { "$sample": { "size": i64::from(sample_size) } }];

    let mut cursor = coll.aggregate(pipeline).await.map_err(|e| {
        crate::error::CensusError::collection_failed(
            format!(
                "Failed to sample documents from '{}.{}'",
                database, collection
            ),
            e,
        )
    })?;

    let mut docs = Vec::new();
    while cursor.advance().await.map_err(|e| {
        crate::error::CensusError::collection_failed(
            format!(
                "Failed to iterate sample cursor for '{}.{}'",
                database, collection
            ),
            e,
        )
    })? {
        let doc = cursor.deserialize_current().map_err(|e| {
            crate::error::CensusError::collection_failed(
                format!(
                    "Failed to deserialize sampled document from '{}.{}'",
                    database, collection
                ),
                e,
            )
        })?;
        docs.push(doc);
    }

    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CensusError;
    use crate::index::normalize_index;
    use mongodb::bson::doc;

    #[test]
    fn test_stats_failure_leaves_indexes_intact() {
        let mut snapshot = CollectionSnapshot::new("shop", "orders");

        record_stats(
            &mut snapshot,
            Err(CensusError::configuration("collStats refused")),
        );
        record_indexes(
            &mut snapshot,
            Ok(vec![normalize_index(
                &doc! { "v": 2_i32, "key": { "_id": 1_i32 }, "name": "_id_" },
                "shop.orders",
            )]),
        );

        assert_eq!(snapshot.indexes.len(), 1);
        assert_eq!(snapshot.summary.total_indexes, 1);
        assert_eq!(snapshot.summary.total_documents, 0);
        // failed stats serialize as an empty object, not null
        let json = serde_json::to_value(&snapshot.stats).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_index_failure_leaves_stats_intact() {
        let mut snapshot = CollectionSnapshot::new("shop", "orders");
        let stats = CollectionStats::from_document(&doc! { "count": 42_i32, "size": 1024_i64 });

        record_stats(&mut snapshot, Ok(stats));
        record_indexes(
            &mut snapshot,
            Err(CensusError::configuration("listIndexes refused")),
        );

        assert_eq!(snapshot.summary.total_documents, 42);
        assert_eq!(snapshot.summary.total_size, 1024);
        assert!(snapshot.indexes.is_empty());
        assert_eq!(snapshot.summary.total_indexes, 0);
    }
}
