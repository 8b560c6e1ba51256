use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./fixtures/scope.na";
const EXPECTED: Expected = Expected {
    stdout: "20\n20\nNameError\n",
    stderr: "",
};

#[test]
fn function_local_scope_does_not_leak_to_caller() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
