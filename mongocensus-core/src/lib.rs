//! Core traversal, aggregation, and export logic for mongocensus.
//!
//! This crate inventories a live MongoDB cluster: it walks the
//! cluster → database → collection hierarchy, rolls per-collection
//! statistics up into per-database and cluster-wide summaries, normalizes
//! heterogeneous index descriptors into a uniform record shape, and
//! serializes sampled documents in canonical Extended JSON so native value
//! types survive for downstream compatibility analysis.
//!
//! # Architecture
//! - [`walk`]: the single-pass cluster walker that drives everything
//! - [`aggregate`] / [`inspect`]: per-database and per-collection stages
//! - [`index`]: raw index descriptor normalization
//! - [`ejson`]: type-preserving document codec
//! - [`emit`]: the three output modes (index-flat, full metadata, samples)
//!
//! Connection bootstrap and file plumbing live in the `mongocensus-export`
//! binary; the core only needs a ready [`mongodb::Client`] and writers.
//!
//! # Failure model
//! Only connection-tier failures abort a run. Every per-database and
//! per-collection operation failure is caught at the narrowest scope,
//! logged to stderr, and replaced with zero-value defaults, so the walk
//! always completes and always emits syntactically valid output.

pub mod aggregate;
pub mod ejson;
pub mod emit;
pub mod error;
pub mod index;
pub mod inspect;
pub mod logging;
pub mod models;
pub mod walk;

// Re-export commonly used types
pub use error::{CensusError, Result, redact_database_url};
pub use logging::init_logging;
pub use models::{
    ClusterSnapshot, CollectionSnapshot, DatabaseSnapshot, IndexRecord, SampleBatch, ServerFacts,
};
pub use walk::{
    DEFAULT_SAMPLE_SIZE, NoopSink, SampleSink, WalkMode, WalkOptions, walk,
};
