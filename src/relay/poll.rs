//! Bounded polling of assistants runs

use crate::llm::{AssistantsApi, LlmError, RunHandle, RunSnapshot, ThreadHandle};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Exponential backoff with a hard deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub multiplier: u32,
    pub max_interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 2,
            max_interval: Duration::from_secs(4),
            max_wait: Duration::from_secs(120),
        }
    }
}

impl PollPolicy {
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    fn next_interval(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.multiplier)
            .min(self.max_interval)
    }
}

/// Poll a run until it reaches a terminal status
///
/// Transient status-check failures are retried until the deadline; anything
/// else, the deadline itself, and cancellation end the wait with an error.
pub async fn wait_for_run(
    api: &dyn AssistantsApi,
    thread: &ThreadHandle,
    run: &RunHandle,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<RunSnapshot, LlmError> {
    let deadline = Instant::now() + policy.max_wait;
    let mut interval = policy.initial_interval;
    let mut checks = 0u32;

    loop {
        checks += 1;
        match api.run_status(thread, run).await {
            Ok(snapshot) if snapshot.status.is_terminal() => {
                tracing::debug!(run_id = run.as_str(), checks, status = ?snapshot.status, "Run finished");
                return Ok(snapshot);
            }
            Ok(_) => {}
            Err(e) if e.kind.is_retryable() => {
                tracing::warn!(run_id = run.as_str(), error = %e, "Run status check failed, will retry");
            }
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(LlmError::timeout(format!(
                "Run {} did not finish within {}s",
                run.as_str(),
                policy.max_wait.as_secs()
            )));
        }

        tokio::select! {
            () = cancel.cancelled() => {
                return Err(LlmError::cancelled("Stopped waiting for run"));
            }
            () = tokio::time::sleep(interval.min(deadline - now)) => {}
        }
        interval = policy.next_interval(interval);
    }
}
