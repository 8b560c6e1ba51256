use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./fixtures/loop.na";
const EXPECTED: Expected = Expected {
    stdout: "10\n4\n0\n1\n2\n3\n",
    stderr: "",
};

#[test]
fn for_and_while_loops_honor_break_and_continue() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
