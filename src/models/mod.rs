//! Data models module
//!
//! Contains the sample request and its partitioning, the per-worker
//! partial results and the final estimate.

pub mod estimate;
pub mod sample;

// Re-export commonly used types
pub use estimate::Estimate;
pub use sample::{PartialResult, Partition, Point, SampleRequest};
