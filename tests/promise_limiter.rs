use std::thread::sleep;
use std::time::Duration;

use dana::concurrency::{LimiterConfig, PromiseLimiter};
use dana::error::Location;
use dana::types::Value;

/// Four promises racing a limiter of 2: the first two run eagerly on the
/// pool, the latter two must fall back to synchronous execution rather
/// than blowing past `max_promises`, and every result still comes back
/// in the order it was requested.
#[test]
fn limiter_falls_back_once_outstanding_promises_reach_the_cap() {
    let limiter = PromiseLimiter::new(LimiterConfig { max_promises: 2, ..Default::default() });

    let handles: Vec<_> = (0..4)
        .map(|i| {
            limiter.create_promise(Location::unknown(), move || {
                sleep(Duration::from_millis(100));
                Ok(Value::Int(i))
            })
        })
        .collect();

    let results: Vec<i64> = handles
        .into_iter()
        .map(|h| match h.force() {
            Ok(Value::Int(n)) => n,
            other => panic!("unexpected promise outcome: {other:?}"),
        })
        .collect();

    assert_eq!(results, vec![0, 1, 2, 3]);
    assert!(
        limiter.statistics().synchronous_fallbacks >= 2,
        "expected at least 2 synchronous fallbacks, got {}",
        limiter.statistics().synchronous_fallbacks
    );
}
