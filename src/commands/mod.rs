//! Command implementations for the keel CLI.
//!
//! This module contains the business logic for each CLI command:
//! - `docker` - build the application image, run it against a network
//! - `wallet` - create wallet files, choose the default wallet
//! - `account` - login token management
//! - `config` - inspect and change settings
//!
//! Handlers receive their collaborators through [`Services`] and return a
//! result implementing [`Output`]; printing is left to the dispatcher.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::{DockerBuildArgs, DockerRunArgs, TelemetryState};
use crate::config::{ConfigStore, ResolvedSettings, ValueSource, mask_secret};
use crate::container::errors::image_query_failed;
use crate::container::{base_run_tokens, build_image_invocation, build_run_invocation, image_exists};
use crate::credentials::{self, CredentialSpec};
use crate::dispatcher::Services;
use crate::wallet::KEYSTORE_DIR_NAME;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output. Empty means print nothing.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

fn anchor(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_relative() {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}

fn project_dir(dir: Option<&PathBuf>, cwd: &Path) -> PathBuf {
    dir.map(|d| anchor(d, cwd)).unwrap_or_else(|| cwd.to_path_buf())
}

// === Docker ===

#[derive(Debug, Serialize)]
pub struct DockerRunResult {
    pub network: String,
    pub tag: String,
    pub credential: &'static str,
    /// Only set in print mode; the command line carries secrets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub printed: bool,
}

impl Output for DockerRunResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.command.clone().unwrap_or_default()
    }
}

/// Run the application container, or print the command that would.
///
/// Outside print mode a missing image offers to build it first.
pub fn docker_run(
    args: &DockerRunArgs,
    store: &ConfigStore,
    home: &Path,
    cwd: &Path,
    services: &Services,
) -> Result<DockerRunResult> {
    let dir = project_dir(args.dir.as_ref(), cwd);

    if !args.print {
        ensure_image(&args.tag, &dir, services)?;
    }

    let spec = CredentialSpec::from_options(&args.credentials.to_options()).anchored_at(cwd);
    let credential = credentials::resolve(spec, store.config())?;

    let invocation = build_run_invocation(
        base_run_tokens(store.config().login_token.as_deref()),
        &credential,
        &args.network,
        args.local.then_some(home),
        &args.tag,
    );

    if !args.print {
        services.executor.execute(invocation.tokens(), &dir)?;
    }

    Ok(DockerRunResult {
        network: args.network.clone(),
        tag: args.tag.clone(),
        credential: credential.kind(),
        command: args.print.then(|| invocation.command_line()),
        printed: args.print,
    })
}

fn ensure_image(tag: &str, dir: &Path, services: &Services) -> Result<()> {
    let images = match services.engine.list_images() {
        Ok(images) => images,
        Err(e) => {
            tracing::warn!(error = %e, "image query failed");
            eprintln!("{}", image_query_failed(&e.to_string()));
            return Ok(());
        }
    };

    if image_exists(&images, tag) {
        return Ok(());
    }

    let question = format!(
        "No image tagged '{}' has been built yet. Would you like to build it now?",
        tag
    );
    if services.prompter.confirm(&question) {
        services
            .executor
            .execute(build_image_invocation(tag).tokens(), dir)?;
    }
    Ok(())
}

#[derive(Serialize)]
pub struct DockerBuildResult {
    pub tag: String,
    pub dir: PathBuf,
    pub command: String,
    pub printed: bool,
}

impl Output for DockerBuildResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.printed {
            self.command.clone()
        } else {
            format!("Built image {}", self.tag)
        }
    }
}

/// `docker build -t TAG .` in the project directory.
pub fn docker_build(args: &DockerBuildArgs, cwd: &Path, services: &Services) -> Result<DockerBuildResult> {
    let dir = project_dir(args.dir.as_ref(), cwd);
    let invocation = build_image_invocation(&args.tag);

    if !args.print {
        services.executor.execute(invocation.tokens(), &dir)?;
    }

    Ok(DockerBuildResult {
        tag: args.tag.clone(),
        dir,
        command: invocation.command_line(),
        printed: args.print,
    })
}

// === Wallet ===

#[derive(Serialize)]
pub struct WalletCreateResult {
    pub path: PathBuf,
}

impl Output for WalletCreateResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Created wallet {}", self.path.display())
    }
}

/// Create a wallet file. Without `--password` the user is asked for one.
pub fn wallet_create(
    dir: Option<&PathBuf>,
    password: Option<&str>,
    home: &Path,
    cwd: &Path,
    services: &Services,
) -> Result<WalletCreateResult> {
    let dir = match dir {
        Some(dir) => anchor(dir, cwd),
        None => home.join(KEYSTORE_DIR_NAME),
    };
    let password = match password {
        Some(password) => password.to_string(),
        None => services.prompter.password("Wallet password")?,
    };

    let path = services.wallets.create_wallet(&dir, &password)?;
    Ok(WalletCreateResult { path })
}

#[derive(Serialize)]
pub struct WalletDefaultResult {
    pub path: PathBuf,
    pub has_password: bool,
}

impl Output for WalletDefaultResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Default wallet set to {}", self.path.display())
    }
}

/// Record an existing wallet file (and its password) as the default.
pub fn wallet_default(
    path: &Path,
    password: Option<&str>,
    store: &mut ConfigStore,
    cwd: &Path,
    services: &Services,
) -> Result<WalletDefaultResult> {
    let path = anchor(path, cwd);
    if !path.is_file() {
        return Err(Error::InvalidInput(format!(
            "wallet file not found: {}",
            path.display()
        )));
    }

    let password = match password {
        Some(password) => password.to_string(),
        None => services
            .prompter
            .password("Wallet password (leave empty for none)")?,
    };

    store.set_default_wallet(&path, &password)?;
    Ok(WalletDefaultResult {
        path,
        has_password: !password.is_empty(),
    })
}

// === Account ===

#[derive(Serialize)]
pub struct LoginResult {
    pub token: String,
}

impl Output for LoginResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Logged in (token {})", self.token)
    }
}

/// Store an account token. Without `--token` the user is asked for one.
pub fn login(token: Option<&str>, store: &mut ConfigStore, services: &Services) -> Result<LoginResult> {
    let token = match token {
        Some(token) => token.to_string(),
        None => services.prompter.password("Login token")?,
    };
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(Error::InvalidInput("login token cannot be empty".to_string()));
    }

    store.set_login_token(Some(token.clone()))?;
    Ok(LoginResult {
        token: mask_secret(&token),
    })
}

#[derive(Serialize)]
pub struct LogoutResult {
    pub was_logged_in: bool,
}

impl Output for LogoutResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.was_logged_in {
            "Logged out".to_string()
        } else {
            "Not logged in".to_string()
        }
    }
}

pub fn logout(store: &mut ConfigStore) -> Result<LogoutResult> {
    let was_logged_in = store.config().login_token.is_some();
    if was_logged_in {
        store.set_login_token(None)?;
    }
    Ok(LogoutResult { was_logged_in })
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: Option<String>,
    pub source: String,
}

#[derive(Serialize)]
pub struct ConfigShowResult {
    pub config_file: PathBuf,
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("Config file: {}", self.config_file.display()), String::new()];
        let width = self.entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
        for entry in &self.entries {
            lines.push(format!(
                "  {:width$}  {}  ({})",
                entry.key,
                entry.value.as_deref().unwrap_or("(unset)"),
                entry.source,
                width = width
            ));
        }
        lines.join("\n")
    }
}

fn stored(key: &'static str, value: Option<String>) -> ConfigEntry {
    let source = if value.is_some() {
        ValueSource::Config
    } else {
        ValueSource::Default
    };
    ConfigEntry {
        key,
        value,
        source: source.to_string(),
    }
}

/// Resolved settings with their sources. Secrets are masked.
pub fn config_show(store: &ConfigStore, settings: &ResolvedSettings) -> ConfigShowResult {
    let config = store.config();
    let password = config.default_wallet_password.as_deref().map(|p| {
        if p.is_empty() {
            "(empty)".to_string()
        } else {
            "********".to_string()
        }
    });

    let entries = vec![
        ConfigEntry {
            key: "home",
            value: Some(settings.home.value.display().to_string()),
            source: settings.home.source.to_string(),
        },
        stored("default-wallet-path", config.default_wallet_path.clone()),
        stored("default-wallet-password", password),
        stored("login-token", config.masked_login_token()),
        ConfigEntry {
            key: "telemetry-disabled",
            value: Some(settings.telemetry_disabled.value.to_string()),
            source: settings.telemetry_disabled.source.to_string(),
        },
        ConfigEntry {
            key: "telemetry-url",
            value: Some(settings.endpoints.telemetry_url.value.clone()),
            source: settings.endpoints.telemetry_url.source.to_string(),
        },
        ConfigEntry {
            key: "update-url",
            value: Some(settings.endpoints.update_url.value.clone()),
            source: settings.endpoints.update_url.source.to_string(),
        },
        stored("latest-version", config.latest_version.clone()),
    ];

    ConfigShowResult {
        config_file: store.path().to_path_buf(),
        entries,
    }
}

#[derive(Serialize)]
pub struct ConfigTelemetryResult {
    pub disabled: bool,
    /// Environment variable that currently overrides the stored flag.
    pub overridden_by: Option<String>,
}

impl Output for ConfigTelemetryResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let state = if self.disabled { "disabled" } else { "enabled" };
        match &self.overridden_by {
            Some(var) => format!("Telemetry {} in config ({} currently overrides it)", state, var),
            None => format!("Telemetry {}", state),
        }
    }
}

/// Persist the telemetry opt-out flag.
pub fn config_telemetry(
    state: TelemetryState,
    store: &mut ConfigStore,
    settings: &ResolvedSettings,
) -> Result<ConfigTelemetryResult> {
    let disabled = state == TelemetryState::Disable;
    store.set_telemetry_disabled(disabled)?;

    let overridden_by = match &settings.telemetry_disabled.source {
        ValueSource::EnvVar(var) => Some(var.clone()),
        _ => None,
    };
    Ok(ConfigTelemetryResult {
        disabled,
        overridden_by,
    })
}
