//! Error types for tile generation.

use thiserror::Error;

pub type TileResult<T> = Result<T, TileError>;

#[derive(Error, Debug)]
pub enum TileError {
    /// The tool could not be started at all (usually not installed)
    #[error("Failed to launch {program} for step '{step}': {source}")]
    Launch {
        step: &'static str,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully
    #[error("Step '{step}' failed ({}): {}", exit_label(.status), failure_detail(.stdout, .stderr))]
    StepFailed {
        step: &'static str,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Lines of stdout kept in a step failure message.
const STDOUT_TAIL_LINES: usize = 20;

fn failure_detail(stdout: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    let lines: Vec<&str> = stdout.trim().lines().collect();
    if lines.is_empty() {
        return stderr.to_string();
    }
    let tail = lines[lines.len().saturating_sub(STDOUT_TAIL_LINES)..].join("\n");
    if stderr.is_empty() {
        format!("stdout: {}", tail)
    } else {
        format!("{}; stdout: {}", stderr, tail)
    }
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}
