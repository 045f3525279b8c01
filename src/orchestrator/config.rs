use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::BatchError;

pub const DEFAULT_RETRY_LIMIT: u32 = 2;
pub const DEFAULT_CACHE_BYTE_BUDGET: usize = 64 * 1024 * 1024;
pub const DEFAULT_PLATFORM_THRESHOLD_PIXELS: u64 = 4_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum number of encodes running at once.
    pub worker_count: usize,
    /// Same-plan retries after a transient failure.
    pub retry_limit: u32,
    /// Upper bound on the summed size of cached results.
    pub cache_byte_budget: usize,
    /// Wall-clock budget per job in milliseconds; `None` disables it.
    pub job_timeout_ms: Option<u64>,
    /// Images above this pixel count are offered to the platform encoder.
    pub platform_threshold_pixels: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            retry_limit: DEFAULT_RETRY_LIMIT,
            cache_byte_budget: DEFAULT_CACHE_BYTE_BUDGET,
            job_timeout_ms: None,
            platform_threshold_pixels: DEFAULT_PLATFORM_THRESHOLD_PIXELS,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.worker_count == 0 {
            return Err(BatchError::InvalidWorkerCount);
        }
        if self.cache_byte_budget == 0 {
            return Err(BatchError::InvalidCacheBudget);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.worker_count >= 1);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.job_timeout(), None);
    }

    #[test]
    fn test_validation() {
        let config = OrchestratorConfig::default().with_worker_count(0);
        assert_eq!(config.validate(), Err(BatchError::InvalidWorkerCount));
        let config = OrchestratorConfig {
            cache_byte_budget: 0,
            ..OrchestratorConfig::default()
        };
        assert_eq!(config.validate(), Err(BatchError::InvalidCacheBudget));
    }

    #[test]
    fn test_partial_json() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{ "worker_count": 3, "job_timeout_ms": 250 }"#).unwrap();
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.retry_limit, DEFAULT_RETRY_LIMIT);
        assert_eq!(config.job_timeout(), Some(Duration::from_millis(250)));
    }
}
