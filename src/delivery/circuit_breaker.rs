//! Circuit Breaker for Delivery Channels
//!
//! A channel that keeps failing is skipped (treated as failed, so the router
//! falls back) until its recovery timeout passes.
//!
//! ```text
//! Closed --[failure_threshold consecutive failures]--> Open
//! Open --[open_timeout elapsed]--> HalfOpen (one probe delivery)
//! HalfOpen --[success]--> Closed
//! HalfOpen --[failure]--> Open
//! ```

use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::constants::circuit_breaker as cb_constants;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Time spent open before a probe is allowed
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: cb_constants::FAILURE_THRESHOLD,
            open_timeout: Duration::from_secs(cb_constants::RECOVERY_TIMEOUT_SECS),
        }
    }
}

/// All mutable state behind one lock so counts and state change together
#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    blocked_count: u64,
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    channel: String,
    inner: RwLock<Inner>,
}

impl CircuitBreaker {
    pub fn new(channel: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            channel: channel.into(),
            inner: RwLock::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
                probe_in_flight: false,
                blocked_count: 0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.write();
        self.refresh(&mut inner);
        inner.state
    }

    /// Whether a delivery may be attempted now
    pub fn allow_request(&self) -> bool {
        let mut inner = self.write();
        self.refresh(&mut inner);

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen if !inner.probe_in_flight => {
                inner.probe_in_flight = true;
                tracing::debug!(channel = %self.channel, "Circuit half-open, allowing probe");
                true
            }
            _ => {
                inner.blocked_count += 1;
                tracing::debug!(channel = %self.channel, "Circuit open, delivery skipped");
                false
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.write();
        inner.failure_count = 0;
        inner.probe_in_flight = false;
        if inner.state != CircuitState::Closed {
            inner.state = CircuitState::Closed;
            inner.opened_at = None;
            tracing::info!(channel = %self.channel, "Circuit closed (channel recovered)");
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.write();
        inner.probe_in_flight = false;

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        channel = %self.channel,
                        failures = inner.failure_count,
                        timeout = ?self.config.open_timeout,
                        "Circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                tracing::warn!(channel = %self.channel, "Circuit re-opened after failed probe");
            }
            CircuitState::Open => {}
        }
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let state = self.state();
        let inner = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        CircuitBreakerStats {
            channel: self.channel.clone(),
            state,
            failure_count: inner.failure_count,
            blocked_count: inner.blocked_count,
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open -> HalfOpen once the timeout has elapsed
    fn refresh(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open
            && inner
                .opened_at
                .is_some_and(|at| at.elapsed() >= self.config.open_timeout)
        {
            inner.state = CircuitState::HalfOpen;
            inner.probe_in_flight = false;
            tracing::info!(channel = %self.channel, "Circuit half-open (testing recovery)");
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub channel: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub blocked_count: u64,
}
