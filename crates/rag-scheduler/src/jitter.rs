//! Start jitter for interval jobs.
//!
//! Tenants connected at the same moment would otherwise hit the upstream
//! platform on the same tick forever.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Random delay applied before each job run.
///
/// ```
/// use rag_scheduler::JitterConfig;
///
/// let config = JitterConfig::new(30);
/// assert!(config.generate_jitter() < std::time::Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JitterConfig {
    /// Maximum jitter in seconds (0 = no jitter).
    pub max_jitter_secs: u64,
}

impl JitterConfig {
    pub fn new(max_jitter_secs: u64) -> Self {
        Self { max_jitter_secs }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// A duration in `[0, max_jitter_secs)`, or zero when disabled.
    pub fn generate_jitter(&self) -> Duration {
        if self.max_jitter_secs == 0 {
            return Duration::ZERO;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..self.max_jitter_secs * 1000);
        Duration::from_millis(jitter_ms)
    }

    pub fn is_enabled(&self) -> bool {
        self.max_jitter_secs > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_zero_is_immediate() {
        let config = JitterConfig::none();
        assert_eq!(config.generate_jitter(), Duration::ZERO);
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_jitter_within_bounds() {
        let config = JitterConfig::new(2);
        for _ in 0..100 {
            assert!(config.generate_jitter() < Duration::from_secs(2));
        }
    }
}
