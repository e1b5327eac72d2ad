//! Anonymized usage reporting.
//!
//! One event is sent per invocation. The foreground process never waits on the
//! network: [`Telemetry::invoke_upload`] re-executes the binary as
//! `keel --telemetry <args...>` in the background and returns immediately; that
//! child performs the blocking [`Telemetry::upload`].

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// The flag that marks a telemetry child process.
pub const TELEMETRY_FLAG: &str = "--telemetry";

const EVENT_NAME: &str = "cli-invocation";

/// Options whose values never leave the machine.
pub const SECRET_OPTIONS: &[&str] = &[
    "--private-key",
    "--wallet-password",
    "--wallet-json",
    "--token",
    "--password",
];

/// Stands in for a redacted value.
pub const REDACTED: &str = "<redacted>";

/// Usage-event reporting.
pub trait Telemetry {
    /// Send the event for `args` now, blocking up to the request timeout.
    fn upload(&self, args: &[String]) -> Result<()>;

    /// Arrange for the event to be sent without blocking the caller.
    fn invoke_upload(&self, args: &[String]) -> Result<()>;
}

/// JSON body of one usage event.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TelemetryEvent {
    pub event: String,
    pub args: String,
    pub os: String,
    pub arch: String,
    pub version: String,
    pub machine_id: String,
    pub timestamp: String,
}

impl TelemetryEvent {
    pub fn new(args: &[String], home: &Path) -> Self {
        Self {
            event: EVENT_NAME.to_string(),
            args: redact_secrets(&strip_telemetry_flag(args)).join(" "),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            machine_id: machine_id(home),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Drop every literal `--telemetry` token.
pub fn strip_telemetry_flag(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(String::as_str)
        .filter(|arg| *arg != TELEMETRY_FLAG)
        .collect()
}

/// Replace the value of every [`SECRET_OPTIONS`] entry, in both the
/// `--opt value` and `--opt=value` forms.
pub fn redact_secrets(args: &[&str]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            redacted.push(REDACTED.to_string());
            hide_next = false;
            continue;
        }
        match arg.split_once('=') {
            Some((option, _)) if SECRET_OPTIONS.contains(&option) => {
                redacted.push(format!("{}={}", option, REDACTED));
            }
            _ => {
                hide_next = SECRET_OPTIONS.contains(arg);
                redacted.push(arg.to_string());
            }
        }
    }
    redacted
}

/// Stable anonymous identifier: a SHA-256 prefix of the keel home path.
pub fn machine_id(home: &Path) -> String {
    let digest = Sha256::digest(home.to_string_lossy().as_bytes());
    hex::encode(&digest[..8])
}

/// POST one event for `args` to `url`.
pub fn upload_telemetry(agent: &ureq::Agent, url: &str, home: &Path, args: &[String]) -> Result<()> {
    let event = TelemetryEvent::new(args, home);
    agent
        .post(url)
        .set("Content-Type", "application/json")
        .send_json(&event)
        .map_err(super::http_error)?;
    tracing::debug!(url, "uploaded telemetry");
    Ok(())
}

/// [`Telemetry`] against the configured analytics endpoint.
#[derive(Debug, Clone)]
pub struct HttpTelemetry {
    agent: ureq::Agent,
    url: String,
    home: PathBuf,
}

impl HttpTelemetry {
    pub fn new(url: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        Self {
            agent: super::agent(),
            url: url.into(),
            home: home.into(),
        }
    }
}

impl Telemetry for HttpTelemetry {
    fn upload(&self, args: &[String]) -> Result<()> {
        upload_telemetry(&self.agent, &self.url, &self.home, args)
    }

    fn invoke_upload(&self, args: &[String]) -> Result<()> {
        let exe = std::env::current_exe()?;
        let child = Command::new(&exe)
            .arg(TELEMETRY_FLAG)
            .args(args.iter().filter(|arg| *arg != TELEMETRY_FLAG))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::ProcessLaunch {
                program: exe.display().to_string(),
                source: e,
            })?;
        tracing::debug!(pid = child.id(), "spawned telemetry upload");
        Ok(())
    }
}
