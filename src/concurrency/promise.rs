//! Lazy and eager promises (spec.md §5 "Concurrency & Resource Model").
//!
//! An `EagerPromise` starts running on the process-wide worker pool the
//! moment it is created; a `LazyPromise` only runs the first time it is
//! forced. Both memoize their result so every observer sees the same
//! resolved value (or the same re-raised exception) exactly once computed.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{DanaException, ErrorKind, Location};
use crate::types::Value;

#[derive(Clone)]
enum Outcome {
    Ok(Value),
    Err(DanaException),
}

struct Shared {
    outcome: Mutex<Option<Outcome>>,
    condvar: Condvar,
}

impl Shared {
    fn new() -> Self {
        Self { outcome: Mutex::new(None), condvar: Condvar::new() }
    }

    fn resolve(&self, outcome: Outcome) {
        let mut guard = self.outcome.lock().unwrap();
        if guard.is_none() {
            *guard = Some(outcome);
            self.condvar.notify_all();
        }
    }

    fn wait(&self, timeout: Option<Duration>) -> Option<Outcome> {
        let mut guard = self.outcome.lock().unwrap();
        let deadline = timeout.map(|d| Instant::now() + d);
        loop {
            if let Some(outcome) = guard.clone() {
                return Some(outcome);
            }
            match deadline {
                None => guard = self.condvar.wait(guard).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    let (g, result) = self.condvar.wait_timeout(guard, deadline - now).unwrap();
                    guard = g;
                    if result.timed_out() && guard.is_none() {
                        return None;
                    }
                }
            }
        }
    }
}

/// A handle to a concurrent call result, forced transparently the first
/// time interpreter code reads it outside an explicit concurrency
/// construct (spec.md §4.7 "promise-transparent").
#[derive(Clone)]
pub struct PromiseHandle {
    shared: Arc<Shared>,
    timeout: Option<Duration>,
    location: Location,
}

impl PromiseHandle {
    fn new(timeout: Option<Duration>, location: Location) -> (Self, Arc<Shared>) {
        let shared = Arc::new(Shared::new());
        (Self { shared: shared.clone(), timeout, location }, shared)
    }

    /// An already-resolved handle, used for the limiter's synchronous
    /// fallback path (spec.md §5 / §11.3) where no worker thread is spun up.
    pub fn ready(value: Value) -> Self {
        let shared = Arc::new(Shared::new());
        shared.resolve(Outcome::Ok(value));
        Self { shared, timeout: None, location: Location::unknown() }
    }

    pub fn ready_err(error: DanaException) -> Self {
        let shared = Arc::new(Shared::new());
        shared.resolve(Outcome::Err(error));
        Self { shared, timeout: None, location: Location::unknown() }
    }

    /// Blocks until the promise resolves (respecting its configured
    /// per-promise timeout), returning the forced value or re-raising the
    /// worker's exception to this observer too.
    pub fn force(&self) -> Result<Value, DanaException> {
        match self.shared.wait(self.timeout) {
            Some(Outcome::Ok(v)) => Ok(v),
            Some(Outcome::Err(e)) => Err(e),
            None => Err(DanaException::new(ErrorKind::Timeout, "promise timed out", self.location.clone())),
        }
    }

    pub fn force_truthy(&self) -> bool {
        self.force().map(|v| v.is_truthy()).unwrap_or(false)
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.outcome.lock().unwrap().is_some()
    }
}

impl std::fmt::Debug for PromiseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PromiseHandle(resolved={})", self.is_resolved())
    }
}

/// Spawns `work` on `pool`, returning a handle that resolves as soon as
/// the worker thread finishes (spec.md §5 "EagerPromise").
pub fn spawn_eager(
    pool: &threadpool::ThreadPool,
    timeout: Option<Duration>,
    location: Location,
    work: impl FnOnce() -> Result<Value, DanaException> + Send + 'static,
) -> PromiseHandle {
    let (handle, shared) = PromiseHandle::new(timeout, location);
    pool.execute(move || {
        let outcome = match work() {
            Ok(v) => Outcome::Ok(v),
            Err(e) => Outcome::Err(e),
        };
        shared.resolve(outcome);
    });
    handle
}

/// A promise that only starts computing the first time it is forced
/// (spec.md §5 "LazyPromise"). Uses a plain `Mutex<Option<thunk>>` rather
/// than the worker pool: laziness means at most one observer ever pays the
/// cost of running it, inline on whichever thread forces it first.
pub struct LazyPromise {
    thunk: Mutex<Option<Box<dyn FnOnce() -> Result<Value, DanaException> + Send>>>,
    shared: Arc<Shared>,
    location: Location,
}

impl LazyPromise {
    pub fn new(location: Location, thunk: impl FnOnce() -> Result<Value, DanaException> + Send + 'static) -> Self {
        Self { thunk: Mutex::new(Some(Box::new(thunk))), shared: Arc::new(Shared::new()), location }
    }

    pub fn force(&self) -> Result<Value, DanaException> {
        let mut slot = self.thunk.lock().unwrap();
        if let Some(thunk) = slot.take() {
            drop(slot);
            let outcome = match thunk() {
                Ok(v) => Outcome::Ok(v),
                Err(e) => Outcome::Err(e),
            };
            self.shared.resolve(outcome);
        }
        match self.shared.wait(None) {
            Some(Outcome::Ok(v)) => Ok(v),
            Some(Outcome::Err(e)) => Err(e),
            None => Err(DanaException::new(ErrorKind::Fatal, "lazy promise produced no outcome", self.location.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eager_promise_memoizes_result() {
        let pool = threadpool::ThreadPool::new(2);
        let handle = spawn_eager(&pool, None, Location::unknown(), || Ok(Value::Int(42)));
        assert!(matches!(handle.force(), Ok(Value::Int(42))));
        assert!(matches!(handle.force(), Ok(Value::Int(42))));
    }

    #[test]
    fn lazy_promise_runs_once() {
        let counter = Arc::new(Mutex::new(0));
        let counter2 = counter.clone();
        let promise = LazyPromise::new(Location::unknown(), move || {
            *counter2.lock().unwrap() += 1;
            Ok(Value::Int(7))
        });
        promise.force().unwrap();
        promise.force().unwrap();
        assert_eq!(*counter.lock().unwrap(), 1);
    }
}
