//! keel - a command-line front end for building and running blockchain client
//! applications in containers.
//!
//! This library provides the core functionality for the `keel` CLI tool:
//! command dispatch, first-run setup, credential resolution and construction
//! of the container invocation.

pub mod banner;
pub mod bootstrap;
pub mod cli;
pub mod commands;
pub mod config;
pub mod container;
pub mod credentials;
pub mod dispatcher;
pub mod exec;
pub mod prompt;
pub mod wallet;
pub mod web;


/// Library-level error type for keel operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] kdl::KdlError),

    #[error("No credential supplied and no default wallet configured")]
    MissingCredential,

    #[error("Failed to launch {program}: {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}", describe_exit(.code))]
    ProcessFailed { program: String, code: Option<i32> },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Process exit code for a failed command.
    ///
    /// A failed child process passes its own status through.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ProcessFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Result type alias for keel operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let failed = Error::ProcessFailed {
            program: "docker run".to_string(),
            code: Some(125),
        };
        assert_eq!(failed.exit_code(), 125);
        assert_eq!(failed.to_string(), "docker run exited with status 125");

        let signalled = Error::ProcessFailed {
            program: "docker run".to_string(),
            code: None,
        };
        assert_eq!(signalled.exit_code(), 1);
        assert_eq!(signalled.to_string(), "docker run exited with a signal");

        assert_eq!(Error::MissingCredential.exit_code(), 1);
    }
}
