#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;
use std::process::{Command, ExitStatus};

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("toolchain error: {message}")]
#[diagnostic(code(lang::toolchain))]
pub struct ToolchainError {
    pub message: String,
}

impl ToolchainError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Assemble and link the given assembly with `gcc -no-pie`, then execute the
/// produced binary with inherited stdio. Intermediates live in a temp
/// directory that is cleaned up on return.
pub fn assemble_and_run(asm: &str) -> Result<ExitStatus, ToolchainError> {
    let dir = tempfile::Builder::new()
        .prefix("lang_build")
        .tempdir()
        .map_err(|e| ToolchainError::new(format!("cannot create temp dir: {e}")))?;

    let exe = assemble(asm, dir.path())?;

    Command::new(&exe)
        .status()
        .map_err(|e| ToolchainError::new(format!("cannot run {}: {e}", exe.display())))
}

fn assemble(asm: &str, dir: &Path) -> Result<std::path::PathBuf, ToolchainError> {
    let asm_path = dir.join("build.s");
    fs::write(&asm_path, asm)
        .map_err(|e| ToolchainError::new(format!("cannot write assembly: {e}")))?;

    let exe_path = dir.join("build.out");
    let out = Command::new("gcc")
        .arg("-no-pie")
        .arg(&asm_path)
        .arg("-o")
        .arg(&exe_path)
        .output()
        .map_err(|e| ToolchainError::new(format!("cannot run gcc: {e}")))?;

    if !out.status.success() {
        return Err(ToolchainError::new(format!(
            "gcc failed (exit {}):\n{}",
            out.status,
            String::from_utf8_lossy(&out.stderr)
        )));
    }
    Ok(exe_path)
}
