use std::time::Duration;

use crate::protocol;

/// Client-wide defaults threaded into every handle.
///
/// Values are plain data constructed by the caller; nothing here reads the
/// environment or caches process-wide state.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Timeout applied to a request when the caller passes none.
    pub request_timeout: Duration,
    /// Per-row mutation ceiling enforced before a commit RPC is issued.
    pub mutation_limit: usize,
    /// Bounds and backoff for long-running operation polling.
    pub poll: PollPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: protocol::DEFAULT_REQUEST_TIMEOUT,
            mutation_limit: protocol::MAX_MUTATIONS,
            poll: PollPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_mutation_limit(mut self, limit: usize) -> Self {
        self.mutation_limit = limit;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}

/// Bounded exponential backoff for operation polling.
#[derive(Clone, Debug, PartialEq)]
pub struct PollPolicy {
    /// Maximum GetOperation attempts before tracking fails.
    pub max_polls: u32,
    /// Delay after the first unfinished poll; doubles per attempt.
    pub base_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_polls: protocol::MAX_OPERATION_POLLS,
            base_delay: protocol::OPERATION_POLL_BASE_DELAY,
        }
    }
}

impl PollPolicy {
    pub fn new(max_polls: u32, base_delay: Duration) -> Self {
        Self {
            max_polls,
            base_delay,
        }
    }

    /// Backoff delay slept after attempt number `attempt` (zero-based)
    /// completes without the operation being done.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}
