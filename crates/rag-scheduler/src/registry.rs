//! Job registry for tracking job metadata and execution status.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a job execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobResult {
    /// Job completed successfully
    Success,
    /// Job failed with an error message
    Failed(String),
    /// Job chose not to run (overlap, lock conflict)
    Skipped(String),
}

/// Status of a registered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_name: String,
    /// Seconds between runs
    pub interval_secs: u64,
    /// When the job last finished (if ever)
    pub last_run: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_result: Option<JobResult>,
    pub run_count: u64,
    pub error_count: u64,
    pub skip_count: u64,
    /// Whether the job is currently executing
    pub is_running: bool,
}

impl JobStatus {
    pub fn new(job_name: String, interval_secs: u64) -> Self {
        Self {
            job_name,
            interval_secs,
            last_run: None,
            last_duration_ms: None,
            last_result: None,
            run_count: 0,
            error_count: 0,
            skip_count: 0,
            is_running: false,
        }
    }
}

/// Thread-safe registry of job statuses.
///
/// ```
/// use rag_scheduler::{JobRegistry, JobResult};
///
/// let registry = JobRegistry::new();
/// registry.register("sync:42", 300);
/// registry.record_start("sync:42");
/// assert!(registry.is_running("sync:42"));
/// registry.record_complete("sync:42", JobResult::Success, 1500);
/// assert!(!registry.is_running("sync:42"));
/// ```
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobStatus>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a job. An existing entry with the same name is replaced.
    pub fn register(&self, job_name: &str, interval_secs: u64) {
        self.write().insert(
            job_name.to_string(),
            JobStatus::new(job_name.to_string(), interval_secs),
        );
    }

    /// Remove a job. Returns whether it was registered.
    pub fn unregister(&self, job_name: &str) -> bool {
        self.write().remove(job_name).is_some()
    }

    pub fn record_start(&self, job_name: &str) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.is_running = true;
        }
    }

    /// Record the outcome of a run.
    pub fn record_complete(&self, job_name: &str, result: JobResult, duration_ms: u64) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.is_running = false;
            status.last_run = Some(Utc::now());
            status.last_duration_ms = Some(duration_ms);
            status.run_count += 1;
            match &result {
                JobResult::Failed(_) => status.error_count += 1,
                JobResult::Skipped(_) => status.skip_count += 1,
                JobResult::Success => {}
            }
            status.last_result = Some(result);
        }
    }

    pub fn get_status(&self, job_name: &str) -> Option<JobStatus> {
        self.read().get(job_name).cloned()
    }

    /// All statuses sorted by job name.
    pub fn get_all_status(&self) -> Vec<JobStatus> {
        let mut all: Vec<JobStatus> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        all
    }

    pub fn is_running(&self, job_name: &str) -> bool {
        self.read()
            .get(job_name)
            .map(|s| s.is_running)
            .unwrap_or(false)
    }

    pub fn is_registered(&self, job_name: &str) -> bool {
        self.read().contains_key(job_name)
    }

    pub fn job_count(&self) -> usize {
        self.read().len()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let registry = JobRegistry::new();
        registry.register("sync:s1", 300);

        let status = registry.get_status("sync:s1").unwrap();
        assert_eq!(status.interval_secs, 300);
        assert_eq!(status.run_count, 0);
        assert!(!status.is_running);
    }

    #[test]
    fn test_counters() {
        let registry = JobRegistry::new();
        registry.register("sync:s1", 300);

        registry.record_start("sync:s1");
        registry.record_complete("sync:s1", JobResult::Success, 10);
        registry.record_complete("sync:s1", JobResult::Failed("timeout".into()), 20);
        registry.record_complete("sync:s1", JobResult::Skipped("locked".into()), 0);

        let status = registry.get_status("sync:s1").unwrap();
        assert_eq!(status.run_count, 3);
        assert_eq!(status.error_count, 1);
        assert_eq!(status.skip_count, 1);
        assert_eq!(status.last_result, Some(JobResult::Skipped("locked".into())));
        assert_eq!(status.last_duration_ms, Some(0));
    }

    #[test]
    fn test_reregister_resets_and_unregister() {
        let registry = JobRegistry::new();
        registry.register("sync:s1", 300);
        registry.record_complete("sync:s1", JobResult::Success, 5);
        registry.register("sync:s1", 60);

        let status = registry.get_status("sync:s1").unwrap();
        assert_eq!(status.run_count, 0);
        assert_eq!(status.interval_secs, 60);

        assert!(registry.unregister("sync:s1"));
        assert!(!registry.unregister("sync:s1"));
        assert_eq!(registry.job_count(), 0);
    }

    #[test]
    fn test_unknown_job_is_ignored() {
        let registry = JobRegistry::new();
        registry.record_start("nope");
        registry.record_complete("nope", JobResult::Success, 1);
        assert!(!registry.is_running("nope"));
        assert!(registry.get_all_status().is_empty());
    }
}
