//! Snapshot data model for cluster inventory output.
//!
//! These structures mirror the committed JSON wire format of the export
//! modes: field names are camelCase on the wire, sizes are raw byte counts,
//! and optional index properties serialize as explicit `null` so consumers
//! can tell "not reported" from a legal zero or empty value.
//!
//! Stats records (`DatabaseStats`, `CollectionStats`) are raw passthroughs
//! of server-reported numerics. When a stats call fails the record stays at
//! its default and serializes as `{}`, so the snapshot shape is fixed
//! regardless of partial failure.

use chrono::{DateTime, Utc};
use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source label stamped into export metadata.
pub const SOURCE_NAME: &str = "MongoDB";

/// Reserved administrative databases, never inventoried.
pub const SYSTEM_DATABASES: &[&str] = &["admin", "config", "local"];

/// Collections with this prefix are operational artifacts, not user data.
pub const SYSTEM_COLLECTION_PREFIX: &str = "system.";

/// Checks whether a database name is one of the reserved administrative
/// databases.
pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.contains(&name)
}

/// Checks whether a collection name is a system collection.
pub fn is_system_collection(name: &str) -> bool {
    name.starts_with(SYSTEM_COLLECTION_PREFIX)
}

/// Complete cluster inventory produced by one walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "mongodb")]
    pub server: ServerFacts,
    pub databases: Vec<DatabaseSnapshot>,
    pub summary: ClusterSummary,
}

impl ClusterSnapshot {
    /// Creates an empty snapshot stamped with the current time.
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            server: ServerFacts::default(),
            databases: Vec::new(),
            summary: ClusterSummary::default(),
        }
    }
}

impl Default for ClusterSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Server build, status, and storage-engine facts, fetched once per walk.
///
/// Every field is best-effort: if the admin commands fail, the walk
/// proceeds and these stay at their absent defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerFacts {
    pub version: Option<String>,
    #[serde(rename = "buildInfo")]
    pub build_info: Option<BuildInfo>,
    #[serde(rename = "serverStatus")]
    pub server_status: Option<ServerStatus>,
    #[serde(rename = "storageEngine")]
    pub storage_engine: Option<String>,
}

/// Subset of the `buildInfo` admin command output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: Option<String>,
    #[serde(rename = "gitVersion")]
    pub git_version: Option<String>,
    pub allocator: Option<String>,
    #[serde(rename = "javascriptEngine")]
    pub javascript_engine: Option<String>,
    #[serde(rename = "sysInfo")]
    pub sys_info: Option<String>,
    pub bits: Option<i64>,
    #[serde(rename = "maxBsonObjectSize")]
    pub max_bson_object_size: Option<i64>,
}

impl BuildInfo {
    /// Projects the interesting fields out of a raw `buildInfo` reply.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            version: get_string(doc, "version"),
            git_version: get_string(doc, "gitVersion"),
            allocator: get_string(doc, "allocator"),
            javascript_engine: get_string(doc, "javascriptEngine"),
            sys_info: get_string(doc, "sysInfo"),
            bits: get_i64(doc, "bits"),
            max_bson_object_size: get_i64(doc, "maxBsonObjectSize"),
        }
    }
}

/// Subset of the `serverStatus` admin command output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerStatus {
    pub host: Option<String>,
    pub version: Option<String>,
    pub process: Option<String>,
    pub pid: Option<i64>,
    pub uptime: Option<i64>,
    #[serde(rename = "uptimeMillis")]
    pub uptime_millis: Option<i64>,
    #[serde(rename = "uptimeEstimate")]
    pub uptime_estimate: Option<i64>,
    #[serde(rename = "localTime")]
    pub local_time: Option<String>,
}

impl ServerStatus {
    /// Projects the interesting fields out of a raw `serverStatus` reply.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            host: get_string(doc, "host"),
            version: get_string(doc, "version"),
            process: get_string(doc, "process"),
            pid: get_i64(doc, "pid"),
            uptime: get_i64(doc, "uptime"),
            uptime_millis: get_i64(doc, "uptimeMillis"),
            uptime_estimate: get_i64(doc, "uptimeEstimate"),
            local_time: doc
                .get_datetime("localTime")
                .ok()
                .and_then(|dt| dt.try_to_rfc3339_string().ok()),
        }
    }
}

/// Cluster-wide derived aggregates, accumulated incrementally per database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSummary {
    #[serde(rename = "totalDatabases")]
    pub total_databases: u64,
    #[serde(rename = "totalCollections")]
    pub total_collections: u64,
    #[serde(rename = "totalIndexes")]
    pub total_indexes: u64,
    #[serde(rename = "totalSize")]
    pub total_size: u64,
    #[serde(rename = "totalDataSize")]
    pub total_data_size: u64,
    #[serde(rename = "totalStorageSize")]
    pub total_storage_size: u64,
}

impl ClusterSummary {
    /// Folds one completed database snapshot into the cluster totals.
    ///
    /// Counts come from the database summary; sizes come from the raw
    /// database stats. A database whose stats call failed contributes
    /// nothing to the size totals but still counts its collections.
    pub fn absorb_database(&mut self, db: &DatabaseSnapshot) {
        self.total_databases += 1;
        self.total_collections += db.summary.total_collections;
        self.total_indexes += db.summary.total_indexes;
        self.total_size += db.stats.total_size.unwrap_or(0);
        self.total_data_size += db.stats.data_size.unwrap_or(0);
        self.total_storage_size += db.stats.storage_size.unwrap_or(0);
    }
}

/// Inventory of one user database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub name: String,
    #[serde(rename = "sizeOnDisk")]
    pub size_on_disk: u64,
    #[serde(rename = "empty")]
    pub is_empty: bool,
    pub stats: DatabaseStats,
    pub collections: Vec<CollectionSnapshot>,
    pub summary: DatabaseSummary,
}

impl DatabaseSnapshot {
    /// Creates a database snapshot with no collections inspected yet.
    pub fn new(name: impl Into<String>, size_on_disk: u64, is_empty: bool) -> Self {
        Self {
            name: name.into(),
            size_on_disk,
            is_empty,
            stats: DatabaseStats::default(),
            collections: Vec::new(),
            summary: DatabaseSummary::default(),
        }
    }
}

/// Raw passthrough of the `dbStats` command output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<u64>,
    #[serde(rename = "avgObjSize", skip_serializing_if = "Option::is_none")]
    pub avg_obj_size: Option<f64>,
    #[serde(rename = "dataSize", skip_serializing_if = "Option::is_none")]
    pub data_size: Option<u64>,
    #[serde(rename = "storageSize", skip_serializing_if = "Option::is_none")]
    pub storage_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexes: Option<u64>,
    #[serde(rename = "indexSize", skip_serializing_if = "Option::is_none")]
    pub index_size: Option<u64>,
    #[serde(rename = "totalSize", skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    #[serde(rename = "scaleFactor", skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<u64>,
}

impl DatabaseStats {
    /// Extracts the tracked numeric fields from a raw `dbStats` reply.
    ///
    /// The server encodes these as i32, i64, or double depending on
    /// magnitude; all encodings are accepted.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            collections: get_u64(doc, "collections"),
            views: get_u64(doc, "views"),
            objects: get_u64(doc, "objects"),
            avg_obj_size: get_f64(doc, "avgObjSize"),
            data_size: get_u64(doc, "dataSize"),
            storage_size: get_u64(doc, "storageSize"),
            indexes: get_u64(doc, "indexes"),
            index_size: get_u64(doc, "indexSize"),
            total_size: get_u64(doc, "totalSize"),
            scale_factor: get_u64(doc, "scaleFactor"),
        }
    }
}

/// Per-database derived aggregates, accumulated incrementally per
/// collection so a failed inspection leaves prior sums intact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSummary {
    #[serde(rename = "totalCollections")]
    pub total_collections: u64,
    #[serde(rename = "totalIndexes")]
    pub total_indexes: u64,
    #[serde(rename = "totalSize")]
    pub total_size: u64,
    #[serde(rename = "totalDataSize")]
    pub total_data_size: u64,
    #[serde(rename = "totalStorageSize")]
    pub total_storage_size: u64,
    #[serde(rename = "totalDocuments")]
    pub total_documents: u64,
}

impl DatabaseSummary {
    /// Folds one inspected collection into the database totals.
    pub fn absorb_collection(&mut self, coll: &CollectionSnapshot) {
        self.total_collections += 1;
        self.total_indexes += coll.summary.total_indexes;
        self.total_size += coll.summary.total_size;
        self.total_storage_size += coll.summary.storage_size;
        self.total_documents += coll.summary.total_documents;
    }
}

/// Inventory of one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub name: String,
    /// Globally unique `<db>.<collection>` identifier.
    pub namespace: String,
    pub stats: CollectionStats,
    pub indexes: Vec<IndexRecord>,
    pub summary: CollectionSummary,
}

impl CollectionSnapshot {
    /// Creates a collection snapshot with zero-value defaults.
    pub fn new(database: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        let namespace = format!("{}.{}", database, name);
        Self {
            name,
            namespace,
            stats: CollectionStats::default(),
            indexes: Vec::new(),
            summary: CollectionSummary::default(),
        }
    }
}

/// Raw passthrough of the `collStats` command output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(rename = "avgObjSize", skip_serializing_if = "Option::is_none")]
    pub avg_obj_size: Option<f64>,
    #[serde(rename = "storageSize", skip_serializing_if = "Option::is_none")]
    pub storage_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nindexes: Option<u64>,
    #[serde(rename = "totalIndexSize", skip_serializing_if = "Option::is_none")]
    pub total_index_size: Option<u64>,
    #[serde(rename = "indexSizes", skip_serializing_if = "Option::is_none")]
    pub index_sizes: Option<BTreeMap<String, u64>>,
}

impl CollectionStats {
    /// Extracts the tracked fields from a raw `collStats` reply.
    pub fn from_document(doc: &Document) -> Self {
        let index_sizes = doc.get_document("indexSizes").ok().map(|sizes| {
            sizes
                .iter()
                .filter_map(|(name, value)| bson_to_u64(value).map(|v| (name.clone(), v)))
                .collect()
        });

        Self {
            size: get_u64(doc, "size"),
            count: get_u64(doc, "count"),
            avg_obj_size: get_f64(doc, "avgObjSize"),
            storage_size: get_u64(doc, "storageSize"),
            capped: doc.get_bool("capped").ok(),
            nindexes: get_u64(doc, "nindexes"),
            total_index_size: get_u64(doc, "totalIndexSize"),
            index_sizes,
        }
    }
}

/// Per-collection derived aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionSummary {
    #[serde(rename = "totalIndexes")]
    pub total_indexes: u64,
    #[serde(rename = "totalDocuments")]
    pub total_documents: u64,
    #[serde(rename = "avgObjSize")]
    pub avg_obj_size: f64,
    #[serde(rename = "totalSize")]
    pub total_size: u64,
    #[serde(rename = "storageSize")]
    pub storage_size: u64,
    #[serde(rename = "indexSize")]
    pub index_size: u64,
}

impl CollectionSummary {
    /// Derives the stats-backed summary fields. Index count is set
    /// separately once the index list is retrieved.
    pub fn apply_stats(&mut self, stats: &CollectionStats) {
        self.total_documents = stats.count.unwrap_or(0);
        self.avg_obj_size = stats.avg_obj_size.unwrap_or(0.0);
        self.total_size = stats.size.unwrap_or(0);
        self.storage_size = stats.storage_size.unwrap_or(0);
        self.index_size = stats.total_index_size.unwrap_or(0);
    }
}

/// Uniform index record normalized from a raw index descriptor.
///
/// `key` preserves the server-reported field order exactly; compound index
/// field order is semantically significant and is never re-sorted. Boolean
/// flags collapse to `false` when absent; every other optional property
/// serializes as explicit `null` so that `expireAfterSeconds: 0` stays
/// distinguishable from "not reported".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub name: String,
    pub key: Vec<(String, serde_json::Value)>,
    pub unique: bool,
    pub sparse: bool,
    pub background: bool,
    #[serde(rename = "partialFilterExpression")]
    pub partial_filter_expression: Option<serde_json::Value>,
    #[serde(rename = "expireAfterSeconds")]
    pub expire_after_seconds: Option<i64>,
    #[serde(rename = "textIndexVersion")]
    pub text_index_version: Option<i64>,
    pub weights: Option<serde_json::Value>,
    pub default_language: Option<String>,
    pub language_override: Option<String>,
    #[serde(rename = "v")]
    pub version: Option<i64>,
    #[serde(rename = "ns")]
    pub namespace: String,
}

/// One collection's sampled documents, tagged with provenance.
///
/// Batches are streamed to a sink during the walk and never stored in the
/// snapshot tree.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    pub database: String,
    pub collection: String,
    pub documents: Vec<Document>,
}

fn get_string(doc: &Document, key: &str) -> Option<String> {
    doc.get_str(key).ok().map(|s| s.to_string())
}

fn get_i64(doc: &Document, key: &str) -> Option<i64> {
    match doc.get(key) {
        Some(Bson::Int64(v)) => Some(*v),
        Some(Bson::Int32(v)) => Some(i64::from(*v)),
        Some(Bson::Double(v)) => Some(*v as i64),
        _ => None,
    }
}

fn get_u64(doc: &Document, key: &str) -> Option<u64> {
    doc.get(key).and_then(bson_to_u64)
}

fn get_f64(doc: &Document, key: &str) -> Option<f64> {
    match doc.get(key) {
        Some(Bson::Double(v)) => Some(*v),
        Some(Bson::Int64(v)) => Some(*v as f64),
        Some(Bson::Int32(v)) => Some(f64::from(*v)),
        _ => None,
    }
}

fn bson_to_u64(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int64(v) if *v >= 0 => Some(*v as u64),
        Bson::Int32(v) if *v >= 0 => Some(*v as u64),
        Bson::Double(v) if *v >= 0.0 => Some(*v as u64),
        _ => None,
    }
}
