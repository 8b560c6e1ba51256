use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./fixtures/struct_coercion.na";
const EXPECTED: Expected = Expected {
    stdout: "40\n",
    stderr: "",
};

#[test]
fn reason_coerces_mock_json_into_a_struct() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
