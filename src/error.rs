//! Error types for task CLI invocations

use thiserror::Error;

/// Errors that can occur when shelling out to the task binary
#[derive(Error, Debug)]
pub enum CliError {
    /// The binary is not installed or not on PATH
    #[error("task binary not found - install taskwarrior or set --task-bin")]
    NotFound,

    /// The process could not be started for another reason
    #[error("failed to spawn task process: {0}")]
    Spawn(#[from] std::io::Error),

    /// The tool itself rejected the invocation
    #[error("task command failed (exit code {code}): {stderr}")]
    CommandFailed {
        /// Exit code from the task process
        code: i32,
        /// Standard error output
        stderr: String,
    },

    /// The subprocess ran past the configured bound and was killed
    #[error("task command exceeded {secs}s timeout")]
    TimedOut { secs: u64 },

    /// Export output blew past the output cap
    #[error("task output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    /// Export output was not a JSON task array
    #[error("failed to parse task export output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for task CLI operations
pub type CliResult<T> = Result<T, CliError>;
