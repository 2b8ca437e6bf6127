//! Overlap handling for interval jobs.
//!
//! A tick that arrives while the previous run of the same job is still in
//! progress is either skipped or allowed to run alongside it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Policy for handling overlapping job executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverlapPolicy {
    /// Skip the tick if the previous run is still active.
    #[default]
    Skip,

    /// Allow concurrent executions.
    Concurrent,
}

/// Tracks whether a job is currently running.
pub struct OverlapGuard {
    is_running: Arc<AtomicBool>,
    policy: OverlapPolicy,
}

impl OverlapGuard {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            is_running: Arc::new(AtomicBool::new(false)),
            policy,
        }
    }

    /// `Some(RunGuard)` if the run should proceed, `None` if it is skipped.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        match self.policy {
            OverlapPolicy::Skip => self
                .is_running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .ok()
                .map(|_| RunGuard {
                    flag: self.is_running.clone(),
                }),
            OverlapPolicy::Concurrent => Some(RunGuard {
                flag: Arc::new(AtomicBool::new(true)),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }
}

/// Clears the running flag when dropped, including on panic.
pub struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_prevents_overlap() {
        let guard = OverlapGuard::new(OverlapPolicy::Skip);
        let first = guard.try_acquire();
        assert!(first.is_some());
        assert!(guard.try_acquire().is_none());
        drop(first);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_concurrent_allows_multiple() {
        let guard = OverlapGuard::new(OverlapPolicy::Concurrent);
        let a = guard.try_acquire();
        let b = guard.try_acquire();
        assert!(a.is_some() && b.is_some());
        assert_eq!(guard.policy(), OverlapPolicy::Concurrent);
    }
}
