use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::bench::{AggregatedProgress, ProgressUpdate, SamplingEngine, WorkerTask};
use crate::config::{EstimateConfig, SeedStrategy, DEFAULT_BATCH_SIZE};
use crate::models::{Estimate, PartialResult, Partition, SampleRequest};
use crate::util::units::{parse_count, parse_duration};
use crate::{MontePiError, Result};

/// Estimate π from `samples` trials split across `workers` threads.
///
/// Each worker seeds its own generator from OS entropy. Returns
/// `InvalidInput` when either count is zero.
pub fn estimate_pi(samples: u64, workers: usize) -> Result<f64> {
    estimate_pi_seeded(samples, workers, SeedStrategy::Entropy).map(|estimate| estimate.pi)
}

/// Blocking fork-join run with an explicit seeding strategy.
pub fn estimate_pi_seeded(samples: u64, workers: usize, seed: SeedStrategy) -> Result<Estimate> {
    let request = SampleRequest::new(samples, workers)?;
    let partition = request.partition();
    let start = Instant::now();

    let partials = fork_join(&partition, seed, DEFAULT_BATCH_SIZE, |task, stop| {
        task.run(|| stop.load(Ordering::Relaxed), None)
    })?;

    Estimate::from_partials(&request, &partition, partials, start.elapsed())
}

// Raises the shared stop flag if the worker thread unwinds
struct StopOnPanic<'a>(&'a AtomicBool);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

/// One scoped thread per worker; the first failure stops the others.
fn fork_join<F>(
    partition: &Partition,
    seed: SeedStrategy,
    batch_size: u64,
    run: F,
) -> Result<Vec<PartialResult>>
where
    F: Fn(&WorkerTask, &AtomicBool) -> Result<PartialResult> + Sync,
{
    let stop = AtomicBool::new(false);
    let stop = &stop;
    let run = &run;

    thread::scope(|scope| -> Result<Vec<PartialResult>> {
        let mut handles = Vec::with_capacity(partition.workers);
        for worker_id in 0..partition.workers {
            let task = WorkerTask::new(worker_id, partition.per_worker, seed, batch_size);
            let spawned = thread::Builder::new()
                .name(format!("montepi-worker-{}", worker_id))
                .spawn_scoped(scope, move || {
                    let _guard = StopOnPanic(stop);
                    let result = run(&task, stop);
                    if result.is_err() {
                        stop.store(true, Ordering::Relaxed);
                    }
                    result
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    stop.store(true, Ordering::Relaxed);
                    // Joined here so a panic among them cannot escape the scope
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(MontePiError::WorkerFailure(format!(
                        "Failed to spawn worker {}: {}",
                        worker_id, e
                    )));
                }
            }
        }

        // Join everything before looking at results so no thread is left behind
        let joined: Vec<_> = handles.into_iter().map(|handle| handle.join()).collect();

        let mut partials = Vec::with_capacity(joined.len());
        let mut failures = Vec::new();
        for (worker_id, outcome) in joined.into_iter().enumerate() {
            match outcome {
                Ok(Ok(partial)) => partials.push(partial),
                Ok(Err(e)) => failures.push(e),
                Err(_) => failures.push(MontePiError::WorkerFailure(format!(
                    "worker {} panicked",
                    worker_id
                ))),
            }
        }

        // Report the failure that stopped the run, not the workers it cancelled
        let root = failures
            .iter()
            .position(|e| !matches!(e, MontePiError::Cancelled(_)))
            .unwrap_or(0);
        match failures.into_iter().nth(root) {
            Some(e) => Err(e),
            None => Ok(partials),
        }
    })
}

/// Run a configured estimation, drawing a progress bar on stderr.
pub async fn run_with_progress(config: EstimateConfig, show_progress: bool) -> Result<Estimate> {
    let engine = SamplingEngine::new(config)?;
    if !show_progress {
        return engine.run(None).await;
    }

    let partition = engine.partition();
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();
    let pb = ProgressBar::new(partition.effective_total);
    pb.set_style(
        ProgressStyle::with_template("{spinner} {pos}/{len} samples ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let handle = tokio::spawn(async move {
        let start = Instant::now();
        let mut latest = vec![None; partition.workers];
        while let Some(update) = rx.recv().await {
            if let Some(slot) = latest.get_mut(update.worker_id) {
                *slot = Some(update);
            }
            let aggregated = AggregatedProgress::from_updates(&latest, start);
            pb.set_position(aggregated.total_drawn);
            if let Some(pi) = aggregated.running_estimate() {
                pb.set_message(format!("π ≈ {:.6}", pi));
            }
        }
        pb.finish_and_clear();
    });

    let result = engine.run(Some(tx)).await;
    handle.await.ok();
    result
}

/// Parallel Monte Carlo estimator for pi
#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = "montepi", version)]
#[command(about = "Estimate pi by sampling points in the unit square across parallel workers")]
pub struct CliArgs {
    /// Total trials, e.g. 1000000 or 10M [default: 100M or the config file]
    #[arg(value_parser = parse_count, allow_negative_numbers = true)]
    pub samples: Option<u64>,

    /// Concurrent partitions [default: 4 or the config file]
    #[arg(value_parser = parse_workers, allow_negative_numbers = true)]
    pub workers: Option<usize>,

    /// Fixed base seed for reproducible runs
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Abort after DUR, e.g. 30s or 2m
    #[arg(long, value_name = "DUR", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Points drawn between cancellation checks
    #[arg(long = "batch", value_name = "N", value_parser = parse_count)]
    pub batch_size: Option<u64>,

    /// Read settings from PATH instead of the default config file
    #[arg(long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// No progress bar or summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_workers(input: &str) -> std::result::Result<usize, String> {
    let count = parse_count(input)?;
    usize::try_from(count).map_err(|_| format!("Too many workers: {}", count))
}

impl CliArgs {
    /// Overlay the arguments on a base configuration
    pub fn apply(&self, mut config: EstimateConfig) -> EstimateConfig {
        if let Some(samples) = self.samples {
            config.samples = samples;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(seed) = self.seed {
            config.seed = SeedStrategy::Fixed(seed);
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Some(timeout);
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        config
    }

    /// Load the config file (explicit path or standard location) and apply the arguments
    pub fn resolve(&self) -> Result<EstimateConfig> {
        let base = match &self.config_path {
            Some(path) => EstimateConfig::load_from(path)?,
            None => EstimateConfig::load()?,
        };

        let config = self.apply(base);
        config.validate()?;
        Ok(config)
    }
}
