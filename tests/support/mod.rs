#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;
use tempfile::TempDir;

pub fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn fixture(name: &str) -> PathBuf {
    repo_root().join("tests/fixtures").join(name)
}

pub fn sigcat_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sigcat"))
}

/// Command for the built binary with logging env vars cleared.
pub fn sigcat() -> Command {
    let mut cmd = Command::new(sigcat_binary());
    cmd.env_remove("SIGCAT_LOG")
        .env_remove("RUST_LOG")
        .env_remove("SIGCAT_EXTERNAL_TYPES");
    cmd
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    cmd.output()
        .with_context(|| format!("failed to run command: {:?}", cmd))
}

/// Write `contents` to `name` inside `dir` and return the path.
pub fn write_catalogue(dir: &TempDir, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Validate a JSON report against `schema/report.schema.json`.
pub fn validate_report_schema(value: &Value) -> Result<()> {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    let schema_value = match SCHEMA.get() {
        Some(existing) => existing,
        None => {
            let path = repo_root().join("schema/report.schema.json");
            let loaded: Value = serde_json::from_reader(File::open(&path)?)
                .with_context(|| format!("parsing {}", path.display()))?;
            SCHEMA.get_or_init(move || loaded)
        }
    };

    let compiled = JSONSchema::compile(schema_value)?;
    if let Err(errors) = compiled.validate(value) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!("report failed schema validation:\n{details}");
    }
    Ok(())
}

pub fn assert_exit(output: &Output, expected: i32) {
    assert_eq!(
        output.status.code(),
        Some(expected),
        "unexpected exit status\nstdout: {}\nstderr: {}",
        stdout_of(output),
        stderr_of(output)
    );
}

pub fn path_str(path: &Path) -> String {
    path.display().to_string()
}
