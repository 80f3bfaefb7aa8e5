//! Final estimate model
//!
//! Combines the per-worker partial counts into a single estimate of π
//! and keeps the bookkeeping of the run alongside it.

use std::time::Duration;
use crate::models::sample::{PartialResult, Partition, SampleRequest};
use crate::util::units::{calculate_rate, format_count, format_duration};
use crate::{MontePiError, Result};

/// Estimate of π produced by one run
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Estimated value of π
    pub pi: f64,
    /// Points inside the quarter-circle across all workers
    pub total_inside: u64,
    /// Number of trials actually executed
    pub effective_total: u64,
    /// Number of trials originally requested
    pub requested_samples: u64,
    /// Number of workers the run was split across
    pub workers: usize,
    /// Wall-clock time from fan-out to join
    pub elapsed: Duration,
    /// Per-worker counts, ordered by worker id
    pub partials: Vec<PartialResult>,
}

impl Estimate {
    /// Combine every worker's count into the final estimate
    ///
    /// Fails if a partition is missing or a worker reports more points
    /// than it was assigned; an estimate is never built from partial data.
    pub fn from_partials(
        request: &SampleRequest,
        partition: &Partition,
        mut partials: Vec<PartialResult>,
        elapsed: Duration,
    ) -> Result<Self> {
        if partials.len() != partition.workers {
            return Err(MontePiError::WorkerFailure(format!(
                "expected {} partial results, got {}",
                partition.workers,
                partials.len()
            )));
        }

        partials.sort_by_key(|p| p.worker_id);

        let mut total_inside = 0u64;
        for partial in &partials {
            if partial.drawn != partition.per_worker || partial.inside > partial.drawn {
                return Err(MontePiError::WorkerFailure(format!(
                    "worker {} reported {} inside of {} drawn, expected {} drawn",
                    partial.worker_id, partial.inside, partial.drawn, partition.per_worker
                )));
            }
            total_inside += partial.inside;
        }

        let pi = total_inside as f64 / partition.effective_total as f64 * 4.0;

        Ok(Self {
            pi,
            total_inside,
            effective_total: partition.effective_total,
            requested_samples: request.samples,
            workers: partition.workers,
            elapsed,
            partials,
        })
    }

    /// Distance from the true value of π
    pub fn absolute_error(&self) -> f64 {
        (self.pi - std::f64::consts::PI).abs()
    }

    /// Sampling rate over the whole run
    pub fn samples_per_second(&self) -> f64 {
        calculate_rate(self.effective_total, self.elapsed)
    }

    /// Get a human-readable summary of the run
    pub fn summary(&self) -> String {
        format!(
            "{} of {} samples inside on {} workers in {} (error {:.6})",
            format_count(self.total_inside),
            format_count(self.effective_total),
            self.workers,
            format_duration(self.elapsed),
            self.absolute_error()
        )
    }
}
