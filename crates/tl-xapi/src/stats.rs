//! Session statistics shared across requests.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const EWMA_ALPHA: f64 = 0.2;

/// Immutable view of the accumulated session counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionStatsSnapshot {
    pub exchanges: u64,
    pub connects: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub timeouts: u64,
    pub cancellations: u64,
    pub failures: u64,
    /// Duration of the most recent completed exchange.
    pub last_exchange: Duration,
    /// Smoothed exchange duration in milliseconds.
    pub avg_exchange_ms: f64,
    pub elapsed: Duration,
}

#[derive(Debug)]
struct StatsState {
    exchanges: u64,
    connects: u64,
    bytes_sent: u64,
    bytes_received: u64,
    timeouts: u64,
    cancellations: u64,
    failures: u64,
    last_exchange: Duration,
    avg_exchange_ms: f64,
    start: Instant,
}

impl StatsState {
    fn new() -> Self {
        Self {
            exchanges: 0,
            connects: 0,
            bytes_sent: 0,
            bytes_received: 0,
            timeouts: 0,
            cancellations: 0,
            failures: 0,
            last_exchange: Duration::ZERO,
            avg_exchange_ms: 0.0,
            start: Instant::now(),
        }
    }
}

#[derive(Debug)]
struct StatsInner {
    state: Mutex<StatsState>,
}

/// Cloneable accumulator; every clone updates the same counters.
#[derive(Debug, Clone)]
pub struct SessionStats {
    inner: Arc<StatsInner>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatsInner {
                state: Mutex::new(StatsState::new()),
            }),
        }
    }

    fn with_state(&self, f: impl FnOnce(&mut StatsState)) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    /// Record an established TCP connection.
    pub fn record_connect(&self) {
        self.with_state(|state| state.connects += 1);
    }

    pub fn record_sent(&self, bytes: usize) {
        self.with_state(|state| state.bytes_sent += bytes as u64);
    }

    pub fn record_received(&self, bytes: usize) {
        self.with_state(|state| state.bytes_received += bytes as u64);
    }

    pub fn record_timeout(&self) {
        self.with_state(|state| state.timeouts += 1);
    }

    pub fn record_cancellation(&self) {
        self.with_state(|state| state.cancellations += 1);
    }

    pub fn record_failure(&self) {
        self.with_state(|state| state.failures += 1);
    }

    /// Record a completed request/reply exchange and its duration.
    pub fn record_exchange(&self, duration: Duration) {
        self.with_state(|state| {
            state.exchanges += 1;
            state.last_exchange = duration;
            let ms = duration.as_secs_f64() * 1_000.0;
            state.avg_exchange_ms = if state.exchanges == 1 {
                ms
            } else {
                state.avg_exchange_ms + EWMA_ALPHA * (ms - state.avg_exchange_ms)
            };
        });
    }

    pub fn snapshot(&self) -> SessionStatsSnapshot {
        let state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        SessionStatsSnapshot {
            exchanges: state.exchanges,
            connects: state.connects,
            bytes_sent: state.bytes_sent,
            bytes_received: state.bytes_received,
            timeouts: state.timeouts,
            cancellations: state.cancellations,
            failures: state.failures,
            last_exchange: state.last_exchange,
            avg_exchange_ms: state.avg_exchange_ms,
            elapsed: state.start.elapsed(),
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
