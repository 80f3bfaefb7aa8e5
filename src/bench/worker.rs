//! Sampling worker management
//!
//! Fans an estimation run out to a fixed set of blocking worker tasks,
//! joins every one of them, and combines their counts into an estimate.
//! Handles cancellation, run timeouts and progress aggregation.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};
use crate::bench::sampler::{ProgressUpdate, WorkerTask};
use crate::config::EstimateConfig;
use crate::models::{Estimate, PartialResult, Partition, SampleRequest};
use crate::{MontePiError, Result};

/// Worker status for tracking individual worker states
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerStatus {
    /// Worker has not been started
    Idle,
    /// Worker is currently sampling
    Running,
    /// Worker has returned its count
    Completed,
    /// Worker failed with an error
    Failed(String),
    /// Worker was cancelled
    Cancelled,
}

/// Individual worker information
#[derive(Debug)]
pub struct WorkerInfo {
    /// Unique worker ID
    pub id: usize,
    /// Current status of the worker
    pub status: WorkerStatus,
    /// Cancellation sender for stopping the worker
    pub cancel_tx: Option<oneshot::Sender<()>>,
    /// Count returned by the worker, once completed
    pub partial: Option<PartialResult>,
}

impl WorkerInfo {
    /// Create a new worker info
    pub fn new(id: usize) -> Self {
        Self {
            id,
            status: WorkerStatus::Idle,
            cancel_tx: None,
            partial: None,
        }
    }

    /// Check if the worker is active (running)
    pub fn is_active(&self) -> bool {
        matches!(self.status, WorkerStatus::Running)
    }

    /// Check if the worker is completed (success or failure)
    pub fn is_completed(&self) -> bool {
        matches!(
            self.status,
            WorkerStatus::Completed | WorkerStatus::Failed(_) | WorkerStatus::Cancelled
        )
    }
}

/// Aggregated progress across all workers
#[derive(Debug, Clone)]
pub struct AggregatedProgress {
    /// Points drawn across all workers
    pub total_drawn: u64,
    /// Points inside the quarter-circle across all workers
    pub total_inside: u64,
    /// Points assigned across all workers that have reported
    pub total_target: u64,
    /// Elapsed time since the run started
    pub elapsed: Duration,
    /// Number of workers that have reported at least once
    pub active_workers: usize,
}

impl AggregatedProgress {
    /// Aggregate the latest update from each worker
    pub fn from_updates(worker_progress: &[Option<ProgressUpdate>], start_time: Instant) -> Self {
        let mut total_drawn = 0u64;
        let mut total_inside = 0u64;
        let mut total_target = 0u64;
        let mut active_workers = 0;

        for progress in worker_progress.iter().flatten() {
            total_drawn += progress.drawn;
            total_inside += progress.inside;
            total_target += progress.total;
            active_workers += 1;
        }

        Self {
            total_drawn,
            total_inside,
            total_target,
            elapsed: start_time.elapsed(),
            active_workers,
        }
    }

    /// Calculate overall completion percentage (0.0 to 1.0)
    pub fn completion_percentage(&self) -> f64 {
        if self.total_target == 0 {
            0.0
        } else {
            (self.total_drawn as f64) / (self.total_target as f64)
        }
    }

    /// Running estimate from the points drawn so far
    pub fn running_estimate(&self) -> Option<f64> {
        if self.total_drawn == 0 {
            None
        } else {
            Some(self.total_inside as f64 / self.total_drawn as f64 * 4.0)
        }
    }
}

type ProgressSender = mpsc::UnboundedSender<ProgressUpdate>;

// Body of a worker task; `is_cancelled` and `progress` are the task's own
type WorkerRunner =
    fn(&WorkerTask, &mut dyn FnMut() -> bool, Option<&ProgressSender>) -> Result<PartialResult>;

fn sample_partition(
    task: &WorkerTask,
    is_cancelled: &mut dyn FnMut() -> bool,
    progress: Option<&ProgressSender>,
) -> Result<PartialResult> {
    task.run(is_cancelled, progress)
}

struct RunState {
    workers: Vec<WorkerInfo>,
    tasks: Option<JoinSet<Result<PartialResult>>>,
    task_workers: HashMap<task::Id, usize>,
    start_time: Option<Instant>,
    cancelled: bool,
}

/// Fork-join sampling engine over a fixed number of workers
pub struct SamplingEngine {
    config: EstimateConfig,
    request: SampleRequest,
    partition: Partition,
    state: Mutex<RunState>,
}

impl SamplingEngine {
    /// Create a new engine for a validated configuration
    pub fn new(config: EstimateConfig) -> Result<Self> {
        let request = config.request()?;
        let partition = request.partition();

        Ok(Self {
            config,
            request,
            partition,
            state: Mutex::new(RunState {
                workers: Vec::new(),
                tasks: None,
                task_workers: HashMap::new(),
                start_time: None,
                cancelled: false,
            }),
        })
    }

    /// The partition this engine splits the run into
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Start one blocking task per worker
    pub async fn start(&self, progress_tx: Option<ProgressSender>) -> Result<()> {
        self.spawn_workers(progress_tx, sample_partition).await
    }

    async fn spawn_workers(
        &self,
        progress_tx: Option<ProgressSender>,
        runner: WorkerRunner,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.start_time.is_some() {
            return Err(MontePiError::WorkerFailure(
                "Sampling run already started".to_string(),
            ));
        }

        info!(
            samples = self.request.samples,
            workers = self.partition.workers,
            per_worker = self.partition.per_worker,
            effective_total = self.partition.effective_total,
            "starting estimation run"
        );
        if !self.partition.is_exact(&self.request) {
            debug!(
                requested = self.request.samples,
                effective = self.partition.effective_total,
                "sample count rounded to a multiple of the worker count"
            );
        }

        state.start_time = Some(Instant::now());
        let mut tasks = JoinSet::new();

        for worker_id in 0..self.partition.workers {
            let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
            let task = WorkerTask::new(
                worker_id,
                self.partition.per_worker,
                self.config.seed,
                self.config.batch_size,
            );
            let progress = progress_tx.clone();

            let handle = tasks.spawn_blocking(move || {
                // A dropped sender means the engine is gone; stop as well
                let mut is_cancelled = || {
                    !matches!(cancel_rx.try_recv(), Err(oneshot::error::TryRecvError::Empty))
                };
                runner(&task, &mut is_cancelled, progress.as_ref())
            });
            state.task_workers.insert(handle.id(), worker_id);

            let mut worker = WorkerInfo::new(worker_id);
            worker.cancel_tx = Some(cancel_tx);
            worker.status = WorkerStatus::Running;
            state.workers.push(worker);
        }

        state.tasks = Some(tasks);
        Ok(())
    }

    /// Cancel all running workers
    pub async fn cancel_all(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.cancelled = true;
        Self::signal_cancel(&mut state.workers);
        Ok(())
    }

    fn signal_cancel(workers: &mut [WorkerInfo]) {
        for worker in workers.iter_mut() {
            if worker.is_active() {
                if let Some(cancel_tx) = worker.cancel_tx.take() {
                    let _ = cancel_tx.send(()); // Worker may already have finished
                }
                worker.status = WorkerStatus::Cancelled;
            }
        }
    }

    /// Wait for every worker and combine their counts
    ///
    /// Never reports a partial estimate: a worker failure, timeout or
    /// cancellation stops the remaining workers, waits for them, and
    /// returns the error.
    pub async fn wait_for_completion(&self) -> Result<Estimate> {
        let (mut tasks, task_workers, start_time) = {
            let mut state = self.state.lock().await;
            let tasks = state.tasks.take().ok_or_else(|| {
                MontePiError::WorkerFailure("Sampling run was not started".to_string())
            })?;
            let task_workers = std::mem::take(&mut state.task_workers);
            (tasks, task_workers, state.start_time.unwrap_or_else(Instant::now))
        };

        // A deadline past the end of the clock never fires
        let deadline = self
            .config
            .timeout
            .and_then(|limit| start_time.checked_add(limit))
            .map(tokio::time::Instant::from_std);

        let mut partials = Vec::with_capacity(self.partition.workers);
        let mut failure: Option<MontePiError> = None;

        loop {
            let next = match deadline {
                Some(deadline) => {
                    let waited =
                        tokio::time::timeout_at(deadline, tasks.join_next_with_id()).await;
                    match waited {
                        Ok(next) => next,
                        Err(_) => {
                            let limit = self.config.timeout.unwrap_or_default();
                            warn!(timeout = ?limit, "estimation run timed out, cancelling workers");
                            self.abort_remaining(&mut tasks).await;
                            return Err(MontePiError::Timeout(limit));
                        }
                    }
                }
                None => tasks.join_next_with_id().await,
            };

            let Some(joined) = next else { break };

            match joined {
                Ok((id, Ok(partial))) => {
                    if let Some(&worker_id) = task_workers.get(&id) {
                        self.set_status(worker_id, WorkerStatus::Completed, Some(partial))
                            .await;
                    }
                    partials.push(partial);
                }
                Ok((id, Err(e))) => {
                    let status = match &e {
                        MontePiError::Cancelled(_) => WorkerStatus::Cancelled,
                        _ => WorkerStatus::Failed(e.to_string()),
                    };
                    if let Some(&worker_id) = task_workers.get(&id) {
                        self.set_status(worker_id, status, None).await;
                    }
                    failure = Some(e);
                    break;
                }
                Err(e) => {
                    let worker = task_workers.get(&e.id()).copied();
                    let message = match worker {
                        Some(worker_id) => format!("worker {} failed to join: {}", worker_id, e),
                        None => format!("Worker join failed: {}", e),
                    };
                    if let Some(worker_id) = worker {
                        self.set_status(worker_id, WorkerStatus::Failed(message.clone()), None)
                            .await;
                    }
                    failure = Some(MontePiError::WorkerFailure(message));
                    break;
                }
            }
        }

        if let Some(e) = failure {
            warn!(error = %e, "worker failed, cancelling remaining workers");
            self.abort_remaining(&mut tasks).await;
            return Err(e);
        }

        if self.state.lock().await.cancelled {
            return Err(MontePiError::Cancelled(
                "estimation run was cancelled".to_string(),
            ));
        }

        let elapsed = start_time.elapsed();
        let estimate = Estimate::from_partials(&self.request, &self.partition, partials, elapsed)?;

        info!(
            pi = estimate.pi,
            inside = estimate.total_inside,
            total = estimate.effective_total,
            elapsed = ?elapsed,
            "estimation run complete"
        );

        Ok(estimate)
    }

    /// Start the run and wait for the estimate
    pub async fn run(&self, progress_tx: Option<ProgressSender>) -> Result<Estimate> {
        self.start(progress_tx).await?;
        self.wait_for_completion().await
    }

    // Blocking tasks cannot be aborted, so signal and drain them
    async fn abort_remaining(&self, tasks: &mut JoinSet<Result<PartialResult>>) {
        {
            let mut state = self.state.lock().await;
            Self::signal_cancel(&mut state.workers);
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Err(e)) => debug!(error = %e, "worker stopped"),
                Err(e) => warn!(error = %e, "worker failed while stopping"),
                Ok(Ok(_)) => {}
            }
        }
    }

    async fn set_status(
        &self,
        worker_id: usize,
        status: WorkerStatus,
        partial: Option<PartialResult>,
    ) {
        let mut state = self.state.lock().await;
        if let Some(worker) = state.workers.iter_mut().find(|w| w.id == worker_id) {
            worker.cancel_tx = None;
            worker.partial = partial;
            // A cancelled worker that finished anyway stays marked cancelled
            if worker.status != WorkerStatus::Cancelled || status != WorkerStatus::Completed {
                worker.status = status;
            }
        }
    }

    /// Get current worker statuses
    pub async fn worker_statuses(&self) -> Vec<(usize, WorkerStatus)> {
        let state = self.state.lock().await;
        state.workers.iter().map(|w| (w.id, w.status.clone())).collect()
    }

    /// Get the number of active workers
    pub async fn active_worker_count(&self) -> usize {
        let state = self.state.lock().await;
        state.workers.iter().filter(|w| w.is_active()).count()
    }

    /// Check if all workers are completed
    pub async fn all_workers_completed(&self) -> bool {
        let state = self.state.lock().await;
        state.workers.iter().all(|w| w.is_completed())
    }
}
