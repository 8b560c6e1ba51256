//! Promise-based concurrency for function calls that opt into it
//! (spec.md §5 / §4.7).

pub mod limiter;
pub mod promise;

pub use limiter::{LimiterConfig, LimiterStatistics, PromiseLimiter};
pub use promise::{LazyPromise, PromiseHandle};
