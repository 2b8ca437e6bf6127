//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the scheduler service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds running jobs get to finish after shutdown is signalled.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(SchedulerConfig::default().shutdown_timeout_secs, 5);
    }

    #[test]
    fn test_serde_defaults() {
        let parsed: SchedulerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.shutdown_timeout_secs, 5);
    }
}
