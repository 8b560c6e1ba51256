use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./fixtures/boolean.na";
const EXPECTED: Expected = Expected {
    stdout: "True\nFalse\nFalse\nTrue\n",
    stderr: "",
};

#[test]
fn bool_applies_smart_string_truthiness() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
