use std::{
    error::Error,
    io,
    path::Path,
    process::{Command, Output},
    str,
};

const DANA_PATH: &str = "./target/debug/dana";

pub struct Expected<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
}

impl<'a> Expected<'a> {
    fn assert_matches(self, output: &Output) -> Result<(), Box<dyn Error>> {
        assert_eq!(str::from_utf8(&output.stdout)?, self.stdout);
        assert_eq!(str::from_utf8(&output.stderr)?, self.stderr);
        Ok(())
    }
}

fn run_dana(src_path: &Path) -> Result<Output, io::Error> {
    Command::new(DANA_PATH).arg(src_path).output()
}

pub fn run_dana_with_env(src_path: &Path, env: &[(&str, &str)]) -> Result<Output, io::Error> {
    let mut cmd = Command::new(DANA_PATH);
    cmd.arg(src_path);
    for (k, v) in env {
        cmd.env(k, v);
    }
    cmd.output()
}

pub fn check_run(src_path: &Path, expected: Expected) -> Result<(), Box<dyn Error>> {
    let output = run_dana(src_path)?;
    expected.assert_matches(&output)?;
    assert!(output.status.success(), "dana exited with status {:?}", output.status.code());
    Ok(())
}

pub fn check_run_with_env(src_path: &Path, env: &[(&str, &str)], expected: Expected) -> Result<(), Box<dyn Error>> {
    let output = run_dana_with_env(src_path, env)?;
    expected.assert_matches(&output)?;
    assert!(output.status.success(), "dana exited with status {:?}", output.status.code());
    Ok(())
}

pub fn check_failing_run(src_path: &Path) -> Result<(), Box<dyn Error>> {
    let output = run_dana(src_path)?;
    println!("{output:?}");
    assert!(!output.status.success(), "dana should have exited with a non-zero status");
    Ok(())
}
