//! Precedence resolution for settings that can come from several places.
//!
//! ## Home directory
//!
//! 1. `KEEL_HOME` environment variable
//! 2. `~/.keel`
//!
//! ## Endpoints
//!
//! 1. `KEEL_TELEMETRY_URL` / `KEEL_UPDATE_URL`
//! 2. Built-in defaults
//!
//! ## Telemetry opt-out
//!
//! 1. `KEEL_TELEMETRY_DISABLED` (truthy: `1`, `true`, `yes`, `on`)
//! 2. `telemetry-disabled` in config.kdl
//! 3. `false`
//!
//! Resolution only reads the environment map it is handed, never the process
//! environment, so callers can pass a snapshot or a fake.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::KeelConfig;
use crate::{Error, Result};

/// Environment variable overriding the keel home directory.
pub const KEEL_HOME_ENV: &str = "KEEL_HOME";

/// Environment variable overriding the telemetry endpoint.
pub const TELEMETRY_URL_ENV: &str = "KEEL_TELEMETRY_URL";

/// Environment variable overriding the update-check endpoint.
pub const UPDATE_URL_ENV: &str = "KEEL_UPDATE_URL";

/// Environment variable that disables background telemetry.
pub const TELEMETRY_DISABLED_ENV: &str = "KEEL_TELEMETRY_DISABLED";

/// Default analytics endpoint.
pub const DEFAULT_TELEMETRY_URL: &str = "https://telemetry.keel.dev/api/analytics";

/// Default version-check endpoint.
pub const DEFAULT_UPDATE_URL: &str = "https://releases.keel.dev/api/versions/latest";

/// Name of the keel home directory under the user's home.
pub const HOME_DIR_NAME: &str = ".keel";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    Config,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Config => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Endpoints of the best-effort web services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub telemetry_url: Resolved<String>,
    pub update_url: Resolved<String>,
}

impl Endpoints {
    /// Resolve both endpoints from the environment.
    pub fn resolve(env: &HashMap<String, String>) -> Self {
        Self {
            telemetry_url: resolve_url(env, TELEMETRY_URL_ENV, DEFAULT_TELEMETRY_URL),
            update_url: resolve_url(env, UPDATE_URL_ENV, DEFAULT_UPDATE_URL),
        }
    }
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub home: Resolved<PathBuf>,
    pub endpoints: Endpoints,
    pub telemetry_disabled: Resolved<bool>,
}

impl ResolvedSettings {
    /// Resolve every setting against the environment and loaded config.
    pub fn resolve(env: &HashMap<String, String>, config: &KeelConfig) -> Result<Self> {
        Ok(Self {
            home: resolve_home(env)?,
            endpoints: Endpoints::resolve(env),
            telemetry_disabled: resolve_telemetry_disabled(env, config),
        })
    }
}

/// Resolve the keel home directory.
pub fn resolve_home(env: &HashMap<String, String>) -> Result<Resolved<PathBuf>> {
    if let Some(home) = non_empty(env, KEEL_HOME_ENV) {
        return Ok(Resolved::new(
            PathBuf::from(home),
            ValueSource::EnvVar(KEEL_HOME_ENV.to_string()),
        ));
    }

    let user_home = dirs::home_dir()
        .ok_or_else(|| Error::Other("Could not determine home directory".to_string()))?;
    Ok(Resolved::new(
        user_home.join(HOME_DIR_NAME),
        ValueSource::Default,
    ))
}

/// Resolve whether background telemetry is disabled.
pub fn resolve_telemetry_disabled(
    env: &HashMap<String, String>,
    config: &KeelConfig,
) -> Resolved<bool> {
    if let Some(value) = non_empty(env, TELEMETRY_DISABLED_ENV) {
        return Resolved::new(
            is_truthy(value),
            ValueSource::EnvVar(TELEMETRY_DISABLED_ENV.to_string()),
        );
    }
    if config.telemetry_disabled {
        return Resolved::new(true, ValueSource::Config);
    }
    Resolved::new(false, ValueSource::Default)
}

fn resolve_url(env: &HashMap<String, String>, name: &str, default: &str) -> Resolved<String> {
    match non_empty(env, name) {
        Some(url) => Resolved::new(url.to_string(), ValueSource::EnvVar(name.to_string())),
        None => Resolved::new(default.to_string(), ValueSource::Default),
    }
}

fn non_empty<'a>(env: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    env.get(name).map(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
