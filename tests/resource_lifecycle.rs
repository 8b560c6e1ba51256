use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./fixtures/resource_lifecycle.na";
const EXPECTED: Expected = Expected {
    stdout: "RUNNING\nSTOPPED\nTERMINATED\nResourceError\n",
    stderr: "",
};

#[test]
fn resource_state_transitions_and_rejects_start_after_cleanup() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
