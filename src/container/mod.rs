//! Container invocation building and image queries.
//!
//! [`build_run_invocation`] assembles the argument vector for `docker run`
//! in a fixed order:
//!
//! 1. base tokens (`docker run` + login token)
//! 2. network and service environment (`--env` pairs, `-p` publish)
//! 3. credential environment (and the wallet volume mount)
//! 4. local-mode mount of the keel home directory
//! 5. the image tag
//!
//! The builder is pure: everything it needs is passed in, and the same inputs
//! always produce the same tokens.

pub mod errors;

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::credentials::ResolvedCredential;
use crate::{Error, Result};

/// Container engine binary.
pub const ENGINE_BINARY: &str = "docker";

/// Default image tag for built applications.
pub const DEFAULT_TAG: &str = "web3app";

/// Prefix of variables read by keel itself.
pub const KEEL_VAR_PREFIX: &str = "KEEL_";

/// Prefix of variables read by the generated application.
pub const APP_VAR_PREFIX: &str = "DAPP_";

/// Prefix of variables read by the application's OpenAPI server.
pub const OPENAPI_VAR_PREFIX: &str = "DAPP_OPENAPI_";

/// Address the application's server binds inside the container.
pub const SERVICE_HOST: &str = "0.0.0.0";

/// Port the application's server listens on and publishes.
pub const SERVICE_PORT: u16 = 9090;

/// Where the wallet directory is mounted inside the container.
pub const CONTAINER_KEY_DIR: &str = "/root/key";

/// Where local mode mounts the keel home directory.
pub const CONTAINER_HOME_DIR: &str = "/root/.keel";

/// Upper bound for image-list queries.
pub const IMAGE_QUERY_TIMEOUT_SECS: u64 = 10;

/// A `-v HOST:CONTAINER` bind mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub host: PathBuf,
    pub container: String,
}

impl VolumeMount {
    pub fn new(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
        }
    }
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container)
    }
}

/// Argument vector for an external process, built append-only.
///
/// There is no way to remove or reorder tokens, so what [`RunInvocation::command_line`]
/// renders is exactly what the executor receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInvocation {
    tokens: Vec<String>,
}

impl RunInvocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: impl Into<String>) -> &mut Self {
        self.tokens.push(token.into());
        self
    }

    pub fn extend<I, S>(&mut self, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Append `--env KEY=VALUE`.
    pub fn env(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.push("--env").push(format!("{}={}", key, value))
    }

    /// Append `-v HOST:CONTAINER`.
    pub fn volume(&mut self, mount: &VolumeMount) -> &mut Self {
        self.push("-v").push(mount.to_string())
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    /// Tokens joined by single spaces, as printed in print-only mode.
    pub fn command_line(&self) -> String {
        self.tokens.join(" ")
    }
}

/// `docker run --env KEEL_LOGIN_TOKEN=<token>`.
///
/// An absent token renders as an empty value.
pub fn base_run_tokens(login_token: Option<&str>) -> Vec<String> {
    vec![
        ENGINE_BINARY.to_string(),
        "run".to_string(),
        "--env".to_string(),
        format!("{}LOGIN_TOKEN={}", KEEL_VAR_PREFIX, login_token.unwrap_or_default()),
    ]
}

/// `docker build -t <tag> .`
pub fn build_image_invocation(tag: &str) -> RunInvocation {
    let mut invocation = RunInvocation::new();
    invocation.extend([ENGINE_BINARY, "build", "-t", tag, "."]);
    invocation
}

/// Assemble the full `docker run` argument vector.
///
/// `local_home` is the host keel home to mount when running in local mode.
pub fn build_run_invocation(
    base: Vec<String>,
    credential: &ResolvedCredential,
    network: &str,
    local_home: Option<&Path>,
    tag: &str,
) -> RunInvocation {
    let mut invocation = RunInvocation::new();
    invocation.extend(base);

    push_service_environment(&mut invocation, network);
    push_credential_environment(&mut invocation, credential);

    if let Some(home) = local_home {
        invocation.volume(&VolumeMount::new(home, CONTAINER_HOME_DIR));
    }

    invocation.push(tag);
    invocation
}

fn push_service_environment(invocation: &mut RunInvocation, network: &str) {
    invocation
        .env(&format!("{}HOST", OPENAPI_VAR_PREFIX), SERVICE_HOST)
        .env(&format!("{}NETWORK", APP_VAR_PREFIX), network)
        .env(&format!("{}PORT", OPENAPI_VAR_PREFIX), SERVICE_PORT)
        .push("-p")
        .push(format!("{}:{}", SERVICE_PORT, SERVICE_PORT));
}

fn push_credential_environment(invocation: &mut RunInvocation, credential: &ResolvedCredential) {
    match credential {
        ResolvedCredential::Wallet { path, password } => {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let host_dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };

            invocation
                .env(
                    &format!("{}WALLET_PATH", APP_VAR_PREFIX),
                    format!("{}/{}", CONTAINER_KEY_DIR, file_name),
                )
                .volume(&VolumeMount::new(host_dir, CONTAINER_KEY_DIR));

            // An empty password means "none": no assignment at all.
            if !password.is_empty() {
                invocation.env(&format!("{}WALLET_PASSWORD", APP_VAR_PREFIX), password);
            }
        }
        ResolvedCredential::RawKey(key) => {
            invocation.env(&format!("{}PRIVATE_KEY", APP_VAR_PREFIX), key);
        }
        ResolvedCredential::Json(blob) => {
            invocation.env(&format!("{}WALLET_JSON", APP_VAR_PREFIX), blob);
        }
    }
}

/// Does any `repository:tag` reference start with `tag`?
pub fn image_exists(references: &[String], tag: &str) -> bool {
    references.iter().any(|reference| reference.starts_with(tag))
}

/// Queries against the local container engine.
pub trait ContainerEngine {
    /// All local image references as `repository:tag`.
    fn list_images(&self) -> Result<Vec<String>>;
}

/// [`ContainerEngine`] backed by the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    timeout: Duration,
}

impl DockerEngine {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(IMAGE_QUERY_TIMEOUT_SECS),
        }
    }
}

impl Default for DockerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerEngine for DockerEngine {
    fn list_images(&self) -> Result<Vec<String>> {
        let mut child = Command::new(ENGINE_BINARY)
            .args(["images", "--all", "--format", "{{.Repository}}:{{.Tag}}"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::ProcessLaunch {
                program: ENGINE_BINARY.to_string(),
                source: e,
            })?;

        // Drain stdout on a thread so a large listing cannot block the child.
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Other("Failed to capture docker output".to_string()))?;
        let reader = thread::spawn(move || {
            let mut buffer = String::new();
            stdout.read_to_string(&mut buffer).map(|_| buffer)
        });

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Other(format!(
                    "Timed out listing docker images ({}s)",
                    self.timeout.as_secs()
                )));
            }
        };

        let output = reader
            .join()
            .map_err(|_| Error::Other("docker output reader panicked".to_string()))??;

        if !status.success() {
            return Err(Error::ProcessFailed {
                program: format!("{} images", ENGINE_BINARY),
                code: status.code(),
            });
        }

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
