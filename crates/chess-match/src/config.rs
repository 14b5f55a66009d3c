//! Runtime tuning for the synchronization loop.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A tuning value is out of range.
    #[error("invalid sync configuration: {reason}")]
    Invalid {
        /// What was wrong.
        reason: String,
    },
}

/// Configuration for a [`SyncCoordinator`](crate::sync::SyncCoordinator).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Fixed interval between remote pulls. Default: 2s.
    pub poll_interval: Duration,
    /// Consecutive reconciliation failures tolerated before the match
    /// degrades to local-only play. Default: 5.
    pub max_transient_failures: u32,
}

impl SyncConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                reason: "poll_interval must be > 0".to_string(),
            });
        }
        if self.max_transient_failures == 0 {
            return Err(ConfigError::Invalid {
                reason: "max_transient_failures must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_transient_failures: 5,
        }
    }
}
