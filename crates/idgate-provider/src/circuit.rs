//! Circuit breaker guarding one upstream.
//!
//! Closed until `failure_threshold` consecutive transient failures, then
//! open for `open_for`. After the window one trial call is admitted
//! (half-open): success closes the breaker, failure reopens it.
//!
//! State lives behind a mutex that is only held for the transition itself,
//! never across the guarded call.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive transient failures that open the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before admitting a trial call.
    pub open_for: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
        }
    }
}

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Stable lowercase name, used in health output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
enum Inner {
    Closed { consecutive_failures: u32 },
    Open { until: Instant },
    HalfOpen { trial_in_flight: bool },
}

/// A circuit breaker shared by every call to the same upstream.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::Closed {
                consecutive_failures: 0,
            }),
        }
    }

    /// Current state. An open breaker whose window has elapsed reports
    /// `HalfOpen`, since the next call would be admitted as a trial.
    pub fn state(&self) -> CircuitState {
        match *self.inner.lock() {
            Inner::Closed { .. } => CircuitState::Closed,
            Inner::Open { until } if Instant::now() >= until => CircuitState::HalfOpen,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Ask to make one call. `None` means fail fast without touching the
    /// network.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut inner = self.inner.lock();
        let trial = match *inner {
            Inner::Closed { .. } => false,
            Inner::Open { until } => {
                if Instant::now() < until {
                    return None;
                }
                *inner = Inner::HalfOpen {
                    trial_in_flight: true,
                };
                tracing::info!("circuit half-open, admitting trial call");
                true
            }
            Inner::HalfOpen {
                ref mut trial_in_flight,
            } => {
                if *trial_in_flight {
                    return None;
                }
                *trial_in_flight = true;
                true
            }
        };
        Some(CallPermit {
            breaker: self,
            trial,
            settled: false,
        })
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.inner.lock();
        match *inner {
            Inner::Closed {
                ref mut consecutive_failures,
            } => *consecutive_failures = 0,
            Inner::HalfOpen { .. } if trial => {
                tracing::info!("trial call succeeded, circuit closed");
                *inner = Inner::Closed {
                    consecutive_failures: 0,
                };
            }
            // Late result of a call admitted before the breaker opened.
            _ => {}
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.inner.lock();
        match *inner {
            Inner::Closed {
                ref mut consecutive_failures,
            } => {
                *consecutive_failures += 1;
                if *consecutive_failures >= self.config.failure_threshold {
                    tracing::warn!(
                        failures = *consecutive_failures,
                        open_for = ?self.config.open_for,
                        "circuit opened"
                    );
                    *inner = Inner::Open {
                        until: Instant::now() + self.config.open_for,
                    };
                }
            }
            Inner::HalfOpen { .. } if trial => {
                tracing::warn!(open_for = ?self.config.open_for, "trial call failed, circuit reopened");
                *inner = Inner::Open {
                    until: Instant::now() + self.config.open_for,
                };
            }
            _ => {}
        }
    }

    fn on_abandoned(&self) {
        let mut inner = self.inner.lock();
        if let Inner::HalfOpen {
            ref mut trial_in_flight,
        } = *inner
        {
            *trial_in_flight = false;
        }
    }
}

/// Permission to make one guarded call. Report the outcome with
/// [`CallPermit::record_success`] or [`CallPermit::record_failure`].
///
/// Dropping an unsettled trial permit (e.g. the caller was cancelled)
/// frees the half-open slot for the next caller.
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl CallPermit<'_> {
    /// Whether this permit is the half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// The call completed without a transient failure.
    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    /// The call failed transiently.
    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            self.breaker.on_abandoned();
        }
    }
}
