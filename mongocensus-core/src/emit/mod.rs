//! Export emitters.
//!
//! Three independent presentation modes over the same walk:
//! - [`indexes`]: flat list of every index record on the cluster
//! - [`metadata`]: full snapshot tree plus a human-readable summary
//! - [`samples`]: per-collection document sample blocks in a
//!   line-oriented stream format
//!
//! Each emitter configures the walk differently and owns its output
//! contract; none of them perform file I/O beyond the writer handed in.

pub mod indexes;
pub mod metadata;
pub mod samples;

pub use indexes::{ExportMetadata, IndexExport, build_index_export, export_indexes};
pub use metadata::{export_metadata, write_summary};
pub use samples::{
    FILE_END_MARKER, FILE_START_MARKER, SampleRunStats, SampleStreamWriter, export_samples,
};
