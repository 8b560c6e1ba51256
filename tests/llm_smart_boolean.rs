use std::{error::Error, path::Path};

use test_utils::{check_run_with_env, Expected};

const SRC_PATH: &str = "./fixtures/llm_smart_boolean.na";
const EXPECTED: Expected = Expected {
    stdout: "go\n",
    stderr: "",
};

#[test]
fn reason_result_is_truthy_and_drives_a_branch() -> Result<(), Box<dyn Error>> {
    check_run_with_env(Path::new(SRC_PATH), &[("DANA_MOCK_LLM", "true")], EXPECTED)
}
