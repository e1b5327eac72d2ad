//! Best-effort calls to keel's web services.
//!
//! - `telemetry` - anonymized usage events
//! - `updater` - latest-release lookup
//!
//! Every request goes through an agent with a short timeout. Callers log
//! failures and move on; nothing here is allowed to fail a user command.

pub mod telemetry;
pub mod updater;

use std::time::Duration;

use crate::Error;

/// User-Agent header sent with every request.
pub const USER_AGENT: &str = concat!("keel-cli/", env!("CARGO_PKG_VERSION"));

/// Upper bound for any single request.
pub const HTTP_TIMEOUT_SECS: u64 = 5;

/// Shared agent configuration.
pub fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
}

pub(crate) fn http_error(error: ureq::Error) -> Error {
    match error {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            Error::Http(format!("HTTP {}: {}", code, body.trim()))
        }
        e => Error::Http(e.to_string()),
    }
}
