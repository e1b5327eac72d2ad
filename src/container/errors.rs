//! User-facing error messages.
//!
//! Every failure reported to the terminal follows the format:
//! ```text
//! keel: error: <category>: <brief>
//!
//!   <details>
//!
//!   <suggestion>
//! ```

use std::fmt::Write;

use crate::Error;

/// Error category shown after `keel: error:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Settings file, home directory
    Config,
    /// No usable wallet or key
    Credentials,
    /// Image builds
    Build,
    /// Running containers and other child processes
    Run,
    /// Talking to remote services
    Network,
    /// Wallet generation and keystore files
    Wallet,
    /// Values given on the command line
    Input,
    /// Anything else
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Credentials => write!(f, "credentials"),
            Self::Build => write!(f, "build"),
            Self::Run => write!(f, "run"),
            Self::Network => write!(f, "network"),
            Self::Wallet => write!(f, "wallet"),
            Self::Input => write!(f, "input"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Format a standardized error message.
pub fn format_error(
    category: ErrorCategory,
    brief: &str,
    details: Option<&str>,
    suggestion: Option<&str>,
) -> String {
    let mut msg = format!("keel: error: {}: {}", category, brief);
    push_block(&mut msg, details);
    push_block(&mut msg, suggestion);
    msg
}

/// Format a standardized warning message.
pub fn format_warning(category: ErrorCategory, brief: &str, details: Option<&str>) -> String {
    let mut msg = format!("keel: warning: {}: {}", category, brief);
    push_block(&mut msg, details);
    msg
}

fn push_block(msg: &mut String, block: Option<&str>) {
    let Some(block) = block else {
        return;
    };
    msg.push_str("\n\n");
    for line in block.lines() {
        let _ = writeln!(msg, "  {}", line);
    }
    if msg.ends_with('\n') {
        msg.pop();
    }
}

/// Render any library error for the terminal.
pub fn render(error: &Error) -> String {
    match error {
        Error::MissingCredential => missing_credential(),
        Error::ProcessFailed { program, code } => process_failed(program, *code),
        Error::ProcessLaunch { program, source } => engine_unavailable(program, &source.to_string()),
        Error::Config(e) => format_error(
            ErrorCategory::Config,
            "failed to parse config",
            Some(&e.to_string()),
            Some("Check the KDL syntax in config.kdl, or remove the file to start over."),
        ),
        Error::Wallet(msg) => format_error(ErrorCategory::Wallet, "wallet error", Some(msg), None),
        Error::Http(msg) => format_error(ErrorCategory::Network, "request failed", Some(msg), None),
        Error::InvalidInput(msg) => format_error(ErrorCategory::Input, "invalid input", Some(msg), None),
        other => format_error(ErrorCategory::Internal, &other.to_string(), None, None),
    }
}

// ============================================================================
// Error catalog
// ============================================================================

/// Error: no credential on the command line and no default wallet.
pub fn missing_credential() -> String {
    format_error(
        ErrorCategory::Credentials,
        "no credential available",
        Some("No wallet, private key, or wallet JSON was given, and no default wallet is configured."),
        Some(
            "Options:\n  1. Pass --wallet-path, --private-key, or --wallet-json\n  2. Set a default: keel wallet default <PATH>",
        ),
    )
}

/// Error: a child process exited unsuccessfully.
pub fn process_failed(program: &str, code: Option<i32>) -> String {
    let details = match code {
        Some(code) => format!("'{}' exited with status {}.", program, code),
        None => format!("'{}' was terminated by a signal.", program),
    };
    let category = if program.contains(" build") {
        ErrorCategory::Build
    } else {
        ErrorCategory::Run
    };
    format_error(category, "command failed", Some(&details), None)
}

/// Error: the container engine could not be started.
pub fn engine_unavailable(program: &str, error: &str) -> String {
    format_error(
        ErrorCategory::Run,
        "failed to launch process",
        Some(&format!("Could not start '{}':\n  {}", program, error)),
        Some("Check that docker is installed and on your PATH."),
    )
}

/// Error: first-run setup failed.
pub fn init_failed(error: &Error) -> String {
    format_error(
        ErrorCategory::Config,
        "Failed to initialise the CLI",
        Some(&error.to_string()),
        Some("Check that KEEL_HOME (or ~/.keel) is a writable directory."),
    )
}

/// Warning: the image list could not be read, so the image is assumed present.
pub fn image_query_failed(error: &str) -> String {
    format_warning(
        ErrorCategory::Run,
        "could not list local images",
        Some(&format!("{}\nAssuming the image exists.", error)),
    )
}
