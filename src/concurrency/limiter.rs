//! Bounds how many concurrent promises the interpreter may have
//! outstanding, with a circuit breaker and synchronous fallback (spec.md
//! §5, grounded on
//! `examples/original_source/tests/unit/concurrency/test_promise_limiter.py`).

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::Location;
use crate::types::Value;

use super::promise::{spawn_eager, PromiseHandle};

thread_local! {
    static NESTING_DEPTH: Cell<usize> = Cell::new(0);
}

#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub max_promises: usize,
    pub max_nesting_depth: usize,
    pub timeout: Duration,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_window: Duration,
    pub circuit_breaker_cooldown: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_promises: 64,
            max_nesting_depth: 16,
            timeout: Duration::from_secs(30),
            circuit_breaker_threshold: 5,
            circuit_breaker_window: Duration::from_secs(10),
            circuit_breaker_cooldown: Duration::from_secs(30),
        }
    }
}

impl LimiterConfig {
    /// `Default`, with `max_promises` overridable by `DANA_MAX_PROMISES`
    /// (spec.md §8 scenario 4 names a `max_promises=2` budget; the CLI has
    /// no in-language way to configure it otherwise).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("DANA_MAX_PROMISES") {
            if let Ok(n) = raw.parse() {
                config.max_promises = n;
            }
        }
        config
    }
}

/// Snapshot of the limiter's counters, exposed to DANA/test code as
/// `PromiseLimiter::statistics()` (spec.md §11.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct LimiterStatistics {
    pub outstanding: usize,
    pub synchronous_fallbacks: u64,
    pub circuit_breaker_trips: u64,
    pub total_created: u64,
}

struct CircuitBreaker {
    failures: Mutex<Vec<Instant>>,
    tripped_until: Mutex<Option<Instant>>,
    trips: AtomicU64,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self { failures: Mutex::new(vec![]), tripped_until: Mutex::new(None), trips: AtomicU64::new(0) }
    }

    fn is_open(&self) -> bool {
        match *self.tripped_until.lock().unwrap() {
            Some(until) => Instant::now() < until,
            None => false,
        }
    }

    fn record_failure(&self, config: &LimiterConfig) {
        let now = Instant::now();
        let mut failures = self.failures.lock().unwrap();
        failures.push(now);
        failures.retain(|t| now.duration_since(*t) <= config.circuit_breaker_window);
        if failures.len() as u32 >= config.circuit_breaker_threshold {
            *self.tripped_until.lock().unwrap() = Some(now + config.circuit_breaker_cooldown);
            self.trips.fetch_add(1, Ordering::SeqCst);
            failures.clear();
        }
    }
}

/// Caps outstanding promises and nesting depth, and falls back to
/// synchronous (inline) evaluation rather than erroring when a limit is
/// hit or the circuit breaker is open (spec.md §5 / §11.3).
pub struct PromiseLimiter {
    config: LimiterConfig,
    pool: threadpool::ThreadPool,
    outstanding: std::sync::Arc<AtomicUsize>,
    synchronous_fallbacks: AtomicU64,
    total_created: AtomicU64,
    breaker: CircuitBreaker,
}

impl PromiseLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        let workers = num_cpus::get().max(1);
        Self {
            config,
            pool: threadpool::ThreadPool::new(workers),
            outstanding: std::sync::Arc::new(AtomicUsize::new(0)),
            synchronous_fallbacks: AtomicU64::new(0),
            total_created: AtomicU64::new(0),
            breaker: CircuitBreaker::new(),
        }
    }

    /// Whether a new promise can be created right now without exceeding
    /// `max_promises`, `max_nesting_depth`, or tripping the open breaker.
    pub fn can_create_promise(&self) -> bool {
        if self.breaker.is_open() {
            return false;
        }
        if self.outstanding.load(Ordering::SeqCst) >= self.config.max_promises {
            return false;
        }
        NESTING_DEPTH.with(|d| d.get() < self.config.max_nesting_depth)
    }

    /// Runs `work` as an eager promise when under the limits, or inline
    /// (synchronously) as a fallback otherwise — the caller always gets a
    /// `PromiseHandle` back either way (spec.md §11.3).
    pub fn create_promise(
        &self,
        location: Location,
        work: impl FnOnce() -> Result<Value, crate::error::DanaException> + Send + 'static,
    ) -> PromiseHandle {
        self.total_created.fetch_add(1, Ordering::SeqCst);

        if !self.can_create_promise() {
            self.synchronous_fallbacks.fetch_add(1, Ordering::SeqCst);
            return match self.run_with_depth_tracking(work) {
                Ok(v) => PromiseHandle::ready(v),
                Err(e) => {
                    self.breaker.record_failure(&self.config);
                    PromiseHandle::ready_err(e)
                }
            };
        }

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let outstanding = self.outstanding.clone();
        let timeout = self.config.timeout;
        NESTING_DEPTH.with(|d| d.set(d.get() + 1));
        let handle = spawn_eager(&self.pool, Some(timeout), location, move || {
            let result = work();
            outstanding.fetch_sub(1, Ordering::SeqCst);
            result
        });
        NESTING_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
        handle
    }

    fn run_with_depth_tracking(
        &self,
        work: impl FnOnce() -> Result<Value, crate::error::DanaException>,
    ) -> Result<Value, crate::error::DanaException> {
        NESTING_DEPTH.with(|d| d.set(d.get() + 1));
        let result = work();
        NESTING_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
        result
    }

    pub fn statistics(&self) -> LimiterStatistics {
        LimiterStatistics {
            outstanding: self.outstanding.load(Ordering::SeqCst),
            synchronous_fallbacks: self.synchronous_fallbacks.load(Ordering::SeqCst),
            circuit_breaker_trips: self.breaker.trips.load(Ordering::SeqCst),
            total_created: self.total_created.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_synchronous_when_promise_budget_is_exhausted() {
        let limiter = PromiseLimiter::new(LimiterConfig { max_promises: 0, ..Default::default() });
        let handle = limiter.create_promise(Location::unknown(), || Ok(Value::Int(1)));
        assert!(matches!(handle.force(), Ok(Value::Int(1))));
        assert_eq!(limiter.statistics().synchronous_fallbacks, 1);
    }

    #[test]
    fn circuit_breaker_trips_after_repeated_failures() {
        let config = LimiterConfig { max_promises: 0, circuit_breaker_threshold: 2, ..Default::default() };
        let limiter = PromiseLimiter::new(config);
        for _ in 0..2 {
            let _ = limiter
                .create_promise(Location::unknown(), || {
                    Err(crate::error::DanaException::resource("boom", Location::unknown()))
                })
                .force();
        }
        assert!(!limiter.can_create_promise());
        assert_eq!(limiter.statistics().circuit_breaker_trips, 1);
    }
}
