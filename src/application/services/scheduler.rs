//! Background job scheduler
//!
//! Each registered job gets its own task. A job runs, then sleeps for its
//! interval, then runs again, so runs of one job never overlap and a slow run
//! delays the next one instead of piling up. Jobs are independent of each
//! other. Cancellation is observed only while waiting; a run that has
//! started is allowed to finish.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{DomainError, DomainResult};
use crate::shared::ShutdownSignal;

type JobFn = Arc<dyn Fn() -> BoxFuture<'static, DomainResult<()>> + Send + Sync>;

#[derive(Clone)]
struct Job {
    name: String,
    interval: Duration,
    run_immediately: bool,
    work: JobFn,
}

/// Registry of periodic jobs, started together against one shutdown signal.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Job>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. A zero interval is rejected.
    pub fn add_job<F, Fut>(
        &mut self,
        name: impl Into<String>,
        interval: Duration,
        run_immediately: bool,
        work: F,
    ) -> DomainResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<()>> + Send + 'static,
    {
        let name = name.into();
        if interval.is_zero() {
            return Err(DomainError::Validation(format!(
                "job '{}' needs a positive interval",
                name
            )));
        }
        self.jobs.push(Job {
            name,
            interval,
            run_immediately,
            work: Arc::new(move || Box::pin(work())),
        });
        Ok(())
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|j| j.name.as_str()).collect()
    }

    /// Spawn one task per job. Tasks end once `shutdown` is triggered.
    pub fn start(&self, shutdown: ShutdownSignal) -> Vec<JoinHandle<()>> {
        info!(jobs = self.jobs.len(), "⏱️ Scheduler starting");
        self.jobs
            .iter()
            .cloned()
            .map(|job| tokio::spawn(run_job(job, shutdown.clone())))
            .collect()
    }
}

async fn run_job(job: Job, shutdown: ShutdownSignal) {
    info!(
        job = %job.name,
        interval_secs = job.interval.as_secs_f64(),
        run_immediately = job.run_immediately,
        "Job scheduled"
    );

    if job.run_immediately && !shutdown.is_triggered() {
        run_once(&job).await;
    }

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            _ = tokio::time::sleep(job.interval) => run_once(&job).await,
        }
    }

    info!(job = %job.name, "Job stopped");
}

async fn run_once(job: &Job) {
    let start = Instant::now();
    let result = (job.work)().await;
    let elapsed = start.elapsed().as_secs_f64();

    metrics::histogram!("wvmc_job_duration_seconds", "job" => job.name.clone()).record(elapsed);
    match result {
        Ok(()) => debug!(job = %job.name, elapsed_secs = elapsed, "Job run finished"),
        Err(e) => {
            metrics::counter!("wvmc_job_failures_total", "job" => job.name.clone()).increment(1);
            warn!(job = %job.name, error = %e, "Job run failed");
        }
    }
}
