//! Sampling engine module
//!
//! Contains the per-worker sampling routine and the worker management
//! that fans a run out and joins it back into one estimate.

pub mod sampler;
pub mod worker;

// Re-export commonly used types
pub use sampler::{ProgressUpdate, WorkerTask};
pub use worker::{AggregatedProgress, SamplingEngine, WorkerInfo, WorkerStatus};
