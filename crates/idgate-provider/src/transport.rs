//! Resilient transport: retry with backoff behind a circuit breaker.
//!
//! Every attempt, including each retry, must first be admitted by the
//! breaker. An attempt ending in a transport error, 5xx or 429 counts as one
//! breaker failure and is retried per [`RetryPolicy`]; any other response
//! (including 4xx) counts as success and is handed back to the caller for
//! interpretation. A refused admission returns
//! [`TransportError::CircuitOpen`] immediately and is never retried.
//!
//! Backoff sleeps inside the caller's future, so dropping that future
//! cancels any pending retry.

use std::future::Future;

use crate::circuit::{BreakerConfig, CircuitBreaker, CircuitState};
use crate::error::TransportError;
use crate::retry::{is_transient_status, RetryPolicy};

/// A provider response that was not retried away: status and raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Retry and circuit-breaking wrapper around outbound provider calls.
#[derive(Debug)]
pub struct ResilientTransport {
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientTransport {
    pub fn new(retry: RetryPolicy, breaker: BreakerConfig) -> Self {
        Self {
            retry,
            breaker: CircuitBreaker::new(breaker),
        }
    }

    /// State of the breaker guarding this transport.
    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Run `send` until it yields a non-transient response, retries run
    /// out, or the breaker refuses.
    ///
    /// `send` is called once per attempt and must build a fresh request each
    /// time. `endpoint` names the call in logs and errors.
    pub async fn execute<F, Fut>(&self, endpoint: &str, send: F) -> Result<RawResponse, TransportError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempts: u32 = 0;
        loop {
            let Some(permit) = self.breaker.try_acquire() else {
                tracing::warn!(endpoint, attempts, "circuit open, failing fast");
                return Err(TransportError::CircuitOpen {
                    endpoint: endpoint.to_string(),
                });
            };
            attempts += 1;

            let failure = match send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    match resp.text().await {
                        Ok(body) if is_transient_status(status) => {
                            permit.record_failure();
                            TransportError::UpstreamStatus {
                                endpoint: endpoint.to_string(),
                                status,
                                body,
                                attempts,
                            }
                        }
                        Ok(body) => {
                            permit.record_success();
                            return Ok(RawResponse { status, body });
                        }
                        Err(source) => {
                            permit.record_failure();
                            TransportError::Network {
                                endpoint: endpoint.to_string(),
                                source,
                            }
                        }
                    }
                }
                Err(source) => {
                    permit.record_failure();
                    TransportError::Network {
                        endpoint: endpoint.to_string(),
                        source,
                    }
                }
            };

            if attempts > self.retry.max_retries {
                tracing::error!(endpoint, attempts, "provider call failed, retries exhausted: {failure}");
                return Err(failure);
            }
            let delay = self.retry.delay_for(attempts - 1);
            tracing::warn!(
                endpoint,
                attempt = attempts,
                max_retries = self.retry.max_retries,
                "provider call failed, retrying in {delay:?}: {failure}"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
