//! Domain logic for the OSM region extraction service.
//!
//! Region validation, node-count estimation, the extraction tool client and
//! the shared wire types. Nothing in here knows about HTTP or about how jobs
//! are scheduled.

pub mod density;
pub mod error;
pub mod freshness;
pub mod geometry;
pub mod progress;
pub mod region;
pub mod task;
pub mod tilecover;
pub mod tool;
pub mod types;

#[cfg(all(test, unix))]
mod test_support;
