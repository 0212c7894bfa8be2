//! Classic three-state circuit breaker: closed -> open after N consecutive
//! failures, open -> half-open after a cooldown, half-open -> closed on the
//! first success or back to open on any failure.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Thread-safe circuit breaker. `allow_call` / `record_success` /
/// `record_failure` are the only entry points; callers never observe or
/// set the state directly, which keeps the half-open "single probe" rule
/// from being accidentally bypassed.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
    state: Mutex<CircuitState>,
    opened_at: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            consecutive_failures: AtomicU32::new(0),
            state: Mutex::new(CircuitState::Closed),
            opened_at: AtomicU64::new(0),
        }
    }

    /// Whether a call may be attempted right now. Transitions OPEN ->
    /// HALF_OPEN when the cooldown has elapsed.
    pub fn allow_call(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let opened_at_millis = self.opened_at.load(Ordering::Relaxed);
                if millis_since(opened_at_millis) >= self.cooldown.as_millis() as u64 {
                    *state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Returns `true` iff this call just closed a breaker that was Open or
    /// HalfOpen — i.e. a genuine transition, not a no-op record on an
    /// already-closed breaker.
    pub fn record_success(&self) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap();
        let was_closed = *state == CircuitState::Closed;
        *state = CircuitState::Closed;
        !was_closed
    }

    /// Returns `true` iff this call just opened the breaker.
    pub fn record_failure(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            CircuitState::HalfOpen => {
                self.open(&mut state);
                true
            }
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.failure_threshold {
                    self.open(&mut state);
                    true
                } else {
                    false
                }
            }
            CircuitState::Open => false,
        }
    }

    fn open(&self, state: &mut CircuitState) {
        *state = CircuitState::Open;
        self.opened_at.store(now_millis(), Ordering::Relaxed);
    }

    pub fn state_label(&self) -> &'static str {
        match *self.state.lock().unwrap() {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

fn now_millis() -> u64 {
    use std::time::SystemTime;
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn millis_since(earlier: u64) -> u64 {
    now_millis().saturating_sub(earlier)
}
