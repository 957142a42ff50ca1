use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Tuning knobs for a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum spacing between two consecutive dispatches
    #[serde(rename = "submission_interval_ms", deserialize_with = "millis")]
    pub submission_interval: Duration,
    /// Upper bound on a single audit write
    #[serde(rename = "audit_timeout_ms", deserialize_with = "millis")]
    pub audit_timeout: Duration,
}

impl EngineConfig {
    pub const DEFAULT_SUBMISSION_INTERVAL: Duration = Duration::from_millis(1000);
    pub const DEFAULT_AUDIT_TIMEOUT: Duration = Duration::from_millis(5000);

    pub const fn with_submission_interval(mut self, interval: Duration) -> Self {
        self.submission_interval = interval;
        self
    }

    pub const fn with_audit_timeout(mut self, timeout: Duration) -> Self {
        self.audit_timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            submission_interval: Self::DEFAULT_SUBMISSION_INTERVAL,
            audit_timeout: Self::DEFAULT_AUDIT_TIMEOUT,
        }
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}
