//! redchamber-vector
//!
//! Term-weighted vector index over document chunks: vocabulary and smoothed
//! idf construction, L2-normalized sparse chunk vectors, exhaustive cosine
//! search and a JSON snapshot cache.

pub mod cache;
pub mod index_build;
pub mod search;
pub mod snapshot;

pub use cache::{CacheState, IndexCache};
pub use index_build::build;
pub use search::search;
pub use snapshot::{BuildParams, IndexSnapshot, SnapshotError, SnapshotKey};
