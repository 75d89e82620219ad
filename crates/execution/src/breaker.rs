//! Per-engine circuit breaker.
//!
//! An engine that keeps failing is paused for a while: calls made during the
//! pause are rejected without touching the network. The pause is armed lazily,
//! by the first call after the threshold is reached, and that call still goes
//! out.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tokio::time::Instant;
use tracing::info;

use crate::{ExecutionError, config::BreakerConfig};

/// Snapshot of a breaker's mutable state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreakerState {
    pub consecutive_errors: u32,
    pub paused_until: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    error_threshold: u32,
    backoff: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(error_threshold: u32, backoff: Duration) -> Self {
        Self { error_threshold, backoff, state: Mutex::new(BreakerState::default()) }
    }

    /// Decides whether a call may be attempted now.
    pub fn admit(&self, name: &str) -> Result<(), ExecutionError> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(until) = state.paused_until &&
            now < until
        {
            return Err(ExecutionError::ClientPaused { remaining: until - now });
        }

        if self.error_threshold > 0 && state.consecutive_errors >= self.error_threshold {
            info!(el = %name, duration = ?self.backoff, "Pausing client");
            state.paused_until = Some(now + self.backoff);
            state.consecutive_errors = 0;
        }

        Ok(())
    }

    pub fn record_success(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).consecutive_errors = 0;
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.consecutive_errors = state.consecutive_errors.saturating_add(1);
    }

    pub fn state(&self) -> BreakerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<&BreakerConfig> for CircuitBreaker {
    fn from(config: &BreakerConfig) -> Self {
        Self::new(config.error_threshold, config.backoff())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKOFF: Duration = Duration::from_secs(120);

    fn tripped(threshold: u32) -> CircuitBreaker {
        let breaker = CircuitBreaker::new(threshold, BACKOFF);
        for _ in 0..threshold {
            breaker.admit("el").unwrap();
            breaker.record_failure();
        }
        breaker
    }

    #[tokio::test(start_paused = true)]
    async fn trips_on_the_call_after_threshold() {
        let breaker = tripped(3);
        assert_eq!(breaker.state().consecutive_errors, 3);
        assert_eq!(breaker.state().paused_until, None);

        // The tripping call itself is admitted, and resets the counter.
        breaker.admit("el").unwrap();
        let state = breaker.state();
        assert_eq!(state.consecutive_errors, 0);
        assert_eq!(state.paused_until, Some(Instant::now() + BACKOFF));

        let err = breaker.admit("el").unwrap_err();
        assert!(err.is_paused());
        assert_eq!(breaker.state(), state);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_expires() {
        let breaker = tripped(2);
        breaker.admit("el").unwrap();

        tokio::time::advance(BACKOFF - Duration::from_millis(1)).await;
        assert!(breaker.admit("el").is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        breaker.admit("el").unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_the_counter() {
        let breaker = CircuitBreaker::new(3, BACKOFF);
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.state().consecutive_errors, 0);

        breaker.record_failure();
        breaker.admit("el").unwrap();
        assert_eq!(breaker.state().paused_until, None);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_threshold_never_pauses() {
        let breaker = CircuitBreaker::new(0, BACKOFF);
        for _ in 0..100 {
            breaker.admit("el").unwrap();
            breaker.record_failure();
        }
        assert_eq!(breaker.state().paused_until, None);
    }
}
