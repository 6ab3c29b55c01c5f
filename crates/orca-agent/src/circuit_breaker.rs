//! Per-worker circuit breaker
//!
//! Repeated failures against one worker trip its breaker so the dispatcher
//! fails fast instead of burning the per-invocation timeout. After the
//! cooldown a single probe is let through; its outcome closes or re-trips
//! the breaker.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Failures in a row before the breaker trips
const DEFAULT_THRESHOLD: u32 = 3;
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Sentinel for "never tripped"
const NOT_TRIPPED: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    /// Invocations are refused until the cooldown elapses
    Open,
    /// Cooldown elapsed; the next invocation is a probe
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Breaker for one worker
///
/// Shared through `&self`; all state lives in atomics measured against a
/// monotonic epoch taken at construction.
///
/// ```
/// use std::time::Duration;
/// use orca_agent::{CircuitBreaker, CircuitState};
///
/// let breaker = CircuitBreaker::new(2, Duration::from_secs(30));
/// breaker.record(false);
/// assert!(breaker.record(false));
/// assert_eq!(breaker.state(), CircuitState::Open);
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    epoch: Instant,
    consecutive_failures: AtomicU32,
    /// Millis since `epoch` of the last failure at or past the threshold
    tripped_at: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            epoch: Instant::now(),
            consecutive_failures: AtomicU32::new(0),
            tripped_at: AtomicU64::new(NOT_TRIPPED),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX - 1)
    }

    /// Time left before a probe is allowed; `None` unless open
    fn remaining(&self) -> Option<Duration> {
        let tripped_at = self.tripped_at.load(Ordering::Acquire);
        if tripped_at == NOT_TRIPPED {
            return None;
        }
        let since = Duration::from_millis(self.elapsed_ms().saturating_sub(tripped_at));
        self.cooldown.checked_sub(since).filter(|left| !left.is_zero())
    }

    pub fn state(&self) -> CircuitState {
        if self.tripped_at.load(Ordering::Acquire) == NOT_TRIPPED {
            CircuitState::Closed
        } else if self.remaining().is_some() {
            CircuitState::Open
        } else {
            CircuitState::HalfOpen
        }
    }

    pub fn can_execute(&self) -> bool {
        self.state() != CircuitState::Open
    }

    /// Record an invocation outcome; returns true when this call tripped
    /// the breaker
    pub fn record(&self, success: bool) -> bool {
        if success {
            self.consecutive_failures.store(0, Ordering::Release);
            self.tripped_at.store(NOT_TRIPPED, Ordering::Release);
            return false;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures < self.threshold {
            return false;
        }
        let was_open = self.state() == CircuitState::Open;
        self.tripped_at.store(self.elapsed_ms(), Ordering::Release);
        !was_open
    }

    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    /// Milliseconds until a probe is allowed, 0 unless open
    pub fn retry_in_ms(&self) -> u64 {
        self.remaining()
            .map(|left| u64::try_from(left.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_COOLDOWN)
    }
}
