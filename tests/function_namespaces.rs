use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./fixtures/function_namespaces.na";
const EXPECTED: Expected = Expected {
    stdout: "hello world\n",
    stderr: "",
};

/// `def public:name(...)` registers into the shared `public` function
/// namespace (spec.md §4.9), resolvable by an ordinary unqualified call.
#[test]
fn public_namespaced_function_is_callable_unqualified() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
