//! Bounded retry around exchange calls.
//!
//! Transient failures (timeouts, connection failures) are retried after a
//! fixed delay; every other failure is returned on the spot.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use tracing::warn;

use crate::api::ExchangeError;

/// How many times to try a call and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[cfg(test)]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn backoff(&self) -> FixedAttempts {
        FixedAttempts::new(self.max_attempts - 1, self.delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(3))
    }
}

/// Constant delay, handed out at most `retries` times.
#[derive(Debug, Clone)]
pub struct FixedAttempts {
    retries: u32,
    remaining: u32,
    delay: Duration,
}

impl FixedAttempts {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            retries,
            remaining: retries,
            delay,
        }
    }
}

impl Backoff for FixedAttempts {
    fn reset(&mut self) {
        self.remaining = self.retries;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }
}

/// Runs calls against an exchange client under a [`RetryPolicy`].
pub struct RetryingClient<E> {
    exchange: E,
    policy: RetryPolicy,
}

impl<E> RetryingClient<E> {
    pub fn new(exchange: E, policy: RetryPolicy) -> Self {
        Self { exchange, policy }
    }

    #[cfg(test)]
    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Run `operation` under the client's policy.
    pub async fn execute<'a, T, F, Fut>(&'a self, operation: F) -> Result<T, ExchangeError>
    where
        F: FnMut(&'a E) -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        self.execute_with(self.policy, operation).await
    }

    /// Run `operation` under an explicit policy.
    ///
    /// Returns the first success, the first non-transient error, or
    /// [`ExchangeError::RetriesExhausted`] once every attempt failed
    /// transiently.
    pub async fn execute_with<'a, T, F, Fut>(
        &'a self,
        policy: RetryPolicy,
        mut operation: F,
    ) -> Result<T, ExchangeError>
    where
        F: FnMut(&'a E) -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        let exchange = &self.exchange;
        let max_attempts = policy.max_attempts();
        let mut attempt = 0u32;

        let result = backoff::future::retry_notify(
            policy.backoff(),
            || {
                let call = operation(exchange);
                async move { call.await.map_err(classify) }
            },
            |err: ExchangeError, delay: Duration| {
                attempt += 1;
                println!("Network issue... retrying ({}/{})", attempt, max_attempts);
                warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Network error, retrying"
                );
            },
        )
        .await;

        result.map_err(|err| {
            if err.is_transient() {
                ExchangeError::RetriesExhausted {
                    attempts: max_attempts,
                    source: Box::new(err),
                }
            } else {
                err
            }
        })
    }
}

fn classify(err: ExchangeError) -> backoff::Error<ExchangeError> {
    if err.is_transient() {
        backoff::Error::transient(err)
    } else {
        backoff::Error::permanent(err)
    }
}
