use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./fixtures/import_main.na";
const EXPECTED: Expected = Expected {
    stdout: "hello from helper\n",
    stderr: "",
};

#[test]
fn import_exposes_public_scope_as_a_module_dict() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
