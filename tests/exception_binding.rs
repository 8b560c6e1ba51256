use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./fixtures/exception_binding.na";
const EXPECTED: Expected = Expected {
    stdout: "ZeroDivisionError\n",
    stderr: "",
};

#[test]
fn caught_exception_exposes_type_field() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
