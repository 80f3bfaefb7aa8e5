//! Sample request and partitioning models

use crate::{MontePiError, Result};

/// A validated request for an estimation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRequest {
    /// Total number of Monte Carlo trials requested
    pub samples: u64,
    /// Number of concurrent partitions
    pub workers: usize,
}

impl SampleRequest {
    /// Create a request, rejecting zero samples or zero workers
    pub fn new(samples: u64, workers: usize) -> Result<Self> {
        if samples < 1 {
            return Err(MontePiError::InvalidInput(format!(
                "samples must be at least 1, got {}",
                samples
            )));
        }

        if workers < 1 {
            return Err(MontePiError::InvalidInput(format!(
                "workers must be at least 1, got {}",
                workers
            )));
        }

        Ok(Self { samples, workers })
    }

    /// Split the request evenly across its workers
    pub fn partition(&self) -> Partition {
        Partition::from_request(self)
    }
}

/// Even split of a request across workers
///
/// `per_worker` is the floored share, never below one, so the number of
/// trials actually run (`effective_total`) is always a multiple of the
/// worker count and can exceed the requested samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub per_worker: u64,
    pub workers: usize,
    pub effective_total: u64,
}

impl Partition {
    pub fn from_request(request: &SampleRequest) -> Self {
        let workers = request.workers as u64;
        let per_worker = std::cmp::max(1, request.samples / workers);

        Self {
            per_worker,
            workers: request.workers,
            effective_total: per_worker * workers,
        }
    }

    /// Whether the run executes exactly the requested number of samples
    pub fn is_exact(&self, request: &SampleRequest) -> bool {
        self.effective_total == request.samples
    }
}

/// A point in the unit square
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Inside the unit quarter-circle; the boundary counts as inside
    pub fn is_inside_circle(&self) -> bool {
        self.x * self.x + self.y * self.y <= 1.0
    }
}

/// Inside-count produced by a single worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialResult {
    /// Worker that produced this count
    pub worker_id: usize,
    /// Points drawn by the worker
    pub drawn: u64,
    /// Points that landed inside the quarter-circle
    pub inside: u64,
}

impl PartialResult {
    /// Fraction of drawn points inside the quarter-circle
    pub fn hit_ratio(&self) -> f64 {
        if self.drawn == 0 {
            0.0
        } else {
            self.inside as f64 / self.drawn as f64
        }
    }
}
