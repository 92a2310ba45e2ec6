// Readiness gate: wait for the store to answer its liveness probe before
// issuing writes.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::PageStore;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY_MS: u64 = 250;
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl ReadinessPolicy {
    /// A single probe with no waiting.
    pub fn single_probe() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16)).min(self.max_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// Still transiently failing after every attempt. Callers proceed and
    /// let the retry coordinator handle the real request.
    GaveUp,
    /// A non-transient failure; probing again will not help.
    Fatal(StoreError),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Probe `store` until it answers, fails fatally, or attempts run out.
pub async fn wait_until_ready<S: PageStore>(store: &S, policy: &ReadinessPolicy) -> Readiness {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 0..max_attempts {
        match store.ping().await {
            Ok(()) => {
                debug!(attempt = attempt + 1, "store is ready");
                return Readiness::Ready;
            }
            Err(error) if error.is_transient() => {
                if attempt + 1 == max_attempts {
                    break;
                }
                let delay = policy.delay(attempt);
                debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %error, "store not ready yet");
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                warn!(error = %error, "store readiness probe failed");
                return Readiness::Fatal(error);
            }
        }
    }

    warn!(max_attempts, "store still not ready, proceeding anyway");
    Readiness::GaveUp
}
