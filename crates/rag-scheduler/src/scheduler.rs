//! Scheduler service wrapper around tokio-cron-scheduler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::jitter::JitterConfig;
use crate::overlap::{OverlapGuard, OverlapPolicy};
use crate::registry::{JobRegistry, JobResult};
use crate::{SchedulerConfig, SchedulerError};

/// Named interval jobs over a `JobScheduler`.
///
/// Each name maps to at most one scheduled job.
pub struct SchedulerService {
    scheduler: JobScheduler,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
    is_running: AtomicBool,
    registry: Arc<JobRegistry>,
    jobs: Mutex<HashMap<String, Uuid>>,
}

impl SchedulerService {
    /// Create the scheduler. Jobs may be added before `start()`.
    pub async fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            config,
            shutdown_token: CancellationToken::new(),
            is_running: AtomicBool::new(false),
            registry: Arc::new(JobRegistry::new()),
            jobs: Mutex::new(HashMap::new()),
        })
    }

    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.scheduler.start().await?;
        info!("Scheduler started");
        Ok(())
    }

    /// Signal jobs to stop, give them the configured grace period, then stop.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }

        info!("Initiating scheduler shutdown");
        self.shutdown_token.cancel();

        let deadline = Duration::from_secs(self.config.shutdown_timeout_secs);
        let started = Instant::now();
        while self.registry.get_all_status().iter().any(|s| s.is_running)
            && started.elapsed() < deadline
        {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let mut scheduler = self.scheduler.clone();
        if let Err(e) = scheduler.shutdown().await {
            warn!("Error during scheduler shutdown: {}", e);
        }

        self.is_running.store(false, Ordering::SeqCst);
        info!("Scheduler shutdown complete");
        Ok(())
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> Arc<JobRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn has_job(&self, name: &str) -> bool {
        self.jobs_map().contains_key(name)
    }

    /// Names of scheduled jobs, sorted.
    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs_map().keys().cloned().collect();
        names.sort();
        names
    }

    fn jobs_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Uuid>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Schedule `job_fn` every `every`, replacing any job with the same name.
    ///
    /// The first run happens one interval after registration. A tick that
    /// arrives while the previous run is still active is recorded as skipped.
    pub async fn add_interval_job<F, Fut>(
        &self,
        name: &str,
        every: Duration,
        jitter: JitterConfig,
        job_fn: F,
    ) -> Result<Uuid, SchedulerError>
    where
        F: Fn(CancellationToken) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = JobResult> + Send,
    {
        if every.is_zero() {
            return Err(SchedulerError::InvalidInterval(format!("{name}: zero interval")));
        }

        self.remove_job(name).await?;

        let job_name = name.to_string();
        let token = self.shutdown_token.clone();
        let registry = self.registry.clone();
        let guard = Arc::new(OverlapGuard::new(OverlapPolicy::Skip));

        let job = Job::new_repeated_async(every, move |_uuid, _lock| {
            let name = job_name.clone();
            let token = token.clone();
            let registry = registry.clone();
            let guard = guard.clone();
            let job_fn = job_fn.clone();

            Box::pin(async move {
                if token.is_cancelled() {
                    return;
                }
                let Some(_run) = guard.try_acquire() else {
                    debug!(job = %name, "Previous run still active, skipping tick");
                    registry.record_complete(&name, JobResult::Skipped("overlap".into()), 0);
                    return;
                };

                let delay = jitter.generate_jitter();
                if !delay.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = token.cancelled() => return,
                    }
                }

                registry.record_start(&name);
                let start = Instant::now();
                let result = job_fn(token).await;
                let elapsed = start.elapsed().as_millis() as u64;

                match &result {
                    JobResult::Failed(error) => warn!(job = %name, error = %error, "Job failed"),
                    JobResult::Skipped(reason) => info!(job = %name, reason = %reason, "Job skipped"),
                    JobResult::Success => info!(job = %name, duration_ms = elapsed, "Job completed"),
                }
                registry.record_complete(&name, result, elapsed);
            })
        })?;

        let uuid = self.scheduler.add(job).await?;
        self.registry.register(name, every.as_secs());
        self.jobs_map().insert(name.to_string(), uuid);
        info!(job = %name, uuid = %uuid, interval_secs = every.as_secs(), "Job registered");

        Ok(uuid)
    }

    /// Remove a job by name. Returns whether one was scheduled.
    pub async fn remove_job(&self, name: &str) -> Result<bool, SchedulerError> {
        let existing = self.jobs_map().remove(name);
        let Some(uuid) = existing else {
            return Ok(false);
        };

        self.scheduler.remove(&uuid).await?;
        self.registry.unregister(name);
        info!(job = %name, uuid = %uuid, "Job removed");
        Ok(true)
    }
}
