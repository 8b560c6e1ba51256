use std::{error::Error, path::Path};

use test_utils::{check_run_with_env, Expected};

const SRC_PATH: &str = "./fixtures/reason_promise_limiter.na";
const EXPECTED: Expected = Expected {
    stdout: "FINAL_ANSWER: 1FINAL_ANSWER: 2FINAL_ANSWER: 3FINAL_ANSWER: 4\nTrue\n",
    stderr: "",
};

/// spec.md §8 scenario 4, driven through the interpreter rather than
/// directly against `PromiseLimiter`: four `reason()` calls under a
/// starved limiter (`DANA_MAX_PROMISES=0` forces every one of them to
/// fall back to synchronous execution) still sum in input order and the
/// program completes without deadlock.
#[test]
fn reason_calls_fall_back_under_a_starved_limiter() -> Result<(), Box<dyn Error>> {
    check_run_with_env(Path::new(SRC_PATH), &[("DANA_MAX_PROMISES", "0")], EXPECTED)
}
