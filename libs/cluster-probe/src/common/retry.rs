use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::ProbeError;

/// Caller-side backoff for opening the diagnostic connection.
///
/// The connection layer never retries on its own; a binary that starts before
/// the cluster is ready wraps [`crate::cassandra::open`] in
/// [`retry_with_backoff`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    /// Total attempts, including the first one. Zero is treated as one.
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Backoff {
    pub fn attempts(attempts: u32) -> Self {
        Self {
            attempts,
            ..Self::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before attempt `attempt + 1`, doubling from the initial delay.
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 1,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Run `operation` until it succeeds, the attempts run out, or it fails with
/// an error that waiting cannot fix.
///
/// Only [`ProbeError::Connection`] is retried; a configuration error is
/// returned straight away.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    backoff: &Backoff,
) -> Result<T, ProbeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProbeError>>,
{
    let attempts = backoff.attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Connected after retrying");
                }
                return Ok(value);
            }
            Err(e @ ProbeError::Connection(_)) if attempt < attempts => {
                let delay = backoff.delay_after(attempt);
                warn!(
                    error = %e,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Connection attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> Backoff {
        Backoff::attempts(attempts).with_initial_delay(Duration::from_millis(5))
    }

    #[test]
    fn test_delay_doubles_up_to_max() {
        let backoff = Backoff::attempts(10)
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350));

        assert_eq!(backoff.delay_after(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_after(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_after(3), Duration::from_millis(350));
        assert_eq!(backoff.delay_after(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_succeeds_after_connection_failures() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_with_backoff(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ProbeError::Connection("refused".into()))
                    } else {
                        Ok("connected")
                    }
                }
            },
            &fast(5),
        )
        .await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_last_attempt() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = retry_with_backoff(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProbeError::Connection("refused".into()))
                }
            },
            &fast(3),
        )
        .await;

        assert!(matches!(result, Err(ProbeError::Connection(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_config_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = retry_with_backoff(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProbeError::Config("no contact points".into()))
                }
            },
            &fast(5),
        )
        .await;

        assert!(matches!(result, Err(ProbeError::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = retry_with_backoff(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProbeError::Connection("refused".into()))
                }
            },
            &Backoff::attempts(0),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
