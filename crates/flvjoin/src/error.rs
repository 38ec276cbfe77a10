use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JoinError {
    #[error("No input fragments were given")]
    NoInputs,

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}")]
    ExternalTool {
        tool: String,
        status: ExitStatus,
        /// Diagnostic output captured from the tool, if any.
        output: String,
    },

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    MissingExecutable(#[from] which::Error),
}

impl JoinError {
    /// Captured diagnostic output of a failed external tool.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            JoinError::ExternalTool { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

pub type JoinResult<T> = Result<T, JoinError>;
