//! Interval job scheduler for periodic tenant re-sync.
//!
//! This crate wraps `tokio-cron-scheduler` with named, replaceable interval
//! jobs and graceful shutdown.
//!
//! # Features
//!
//! - Fixed-interval jobs keyed by name; re-adding a name replaces the job
//! - Graceful shutdown via CancellationToken
//! - Skip-on-overlap so a slow run never stacks with the next tick
//! - Start jitter to spread many tenants' timers
//! - Per-job run history via JobRegistry
//!
//! # Example
//!
//! ```ignore
//! use rag_scheduler::{JitterConfig, JobResult, SchedulerConfig, SchedulerService};
//!
//! let scheduler = SchedulerService::new(SchedulerConfig::default()).await?;
//! scheduler.add_interval_job(
//!     "sync:42",
//!     Duration::from_secs(300),
//!     JitterConfig::new(30),
//!     |_token| async { JobResult::Success },
//! ).await?;
//! scheduler.start().await?;
//! ```

mod config;
mod error;
mod jitter;
mod overlap;
mod registry;
mod scheduler;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use jitter::JitterConfig;
pub use overlap::{OverlapGuard, OverlapPolicy, RunGuard};
pub use registry::{JobRegistry, JobResult, JobStatus};
pub use scheduler::SchedulerService;
