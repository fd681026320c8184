use std::time::Duration;

/// Tunables for the order manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound a submitter waits for its order to be processed.
    pub completion_timeout: Duration,
    /// Sleep between checks when waiting by polling.
    pub poll_interval: Duration,
}

impl EngineConfig {
    pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            completion_timeout: Self::DEFAULT_COMPLETION_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }
}
