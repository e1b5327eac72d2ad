//! KDL schema for `config.kdl`.
//!
//! This module provides:
//! - The Rust struct representing the persisted settings
//! - Serialization/deserialization to/from KDL format
//! - Secret masking for display
//! - Legacy-state detection (wallet path recorded without a password)

use chrono::{DateTime, Utc};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Persisted settings stored in config.kdl.
///
/// This file contains secrets (wallet password, login token).
/// **MUST be written with 0600 permissions (owner read/write only)**.
///
/// # KDL Schema
///
/// ```kdl
/// default-wallet-path "/home/me/.keel/keystore/UTC--2026-01-31T09-00-00Z--0f3c.json"
/// default-wallet-password "a1B2c3D4"
/// telemetry-disabled #false
/// login-token "tok_xxxxxxxxxxxx"
/// latest-version "0.2.0"
/// update-checked-at "2026-01-31T09:00:00Z"
/// ```
///
/// `default-wallet-password ""` is a valid "no password" value and is distinct
/// from the node being absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeelConfig {
    /// Wallet used when a command is given no explicit credential
    pub default_wallet_path: Option<String>,

    /// Password of the default wallet (empty string means no password)
    pub default_wallet_password: Option<String>,

    /// Opt-out flag for background telemetry
    pub telemetry_disabled: bool,

    /// Account token from `keel login`
    pub login_token: Option<String>,

    /// Newest released version seen by the last online update check
    pub latest_version: Option<String>,

    /// When `latest_version` was fetched
    pub update_checked_at: Option<DateTime<Utc>>,
}

impl KeelConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A default wallet path is recorded.
    pub fn has_default_wallet(&self) -> bool {
        self.default_wallet_path
            .as_deref()
            .is_some_and(|p| !p.is_empty())
    }

    /// Wallet path present but password never recorded (pre-password configs).
    pub fn is_legacy_wallet_state(&self) -> bool {
        self.has_default_wallet() && self.default_wallet_password.is_none()
    }

    /// Mask the login token for display purposes.
    ///
    /// Shows only the first 4 and last 4 characters.
    pub fn masked_login_token(&self) -> Option<String> {
        self.login_token.as_deref().map(mask_secret)
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        config.default_wallet_path = string_node(doc, "default-wallet-path");
        config.default_wallet_password = string_node(doc, "default-wallet-password");
        config.login_token = string_node(doc, "login-token");
        config.latest_version = string_node(doc, "latest-version");

        if let Some(node) = doc.get("telemetry-disabled") {
            if let Some(entry) = node.entries().first() {
                if let Some(b) = entry.value().as_bool() {
                    config.telemetry_disabled = b;
                }
            }
        }

        if let Some(s) = string_node(doc, "update-checked-at") {
            if let Ok(dt) = s.parse::<DateTime<Utc>>() {
                config.update_checked_at = Some(dt);
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref path) = self.default_wallet_path {
            push_string(&mut doc, "default-wallet-path", path);
        }

        if let Some(ref password) = self.default_wallet_password {
            push_string(&mut doc, "default-wallet-password", password);
        }

        let mut node = KdlNode::new("telemetry-disabled");
        node.push(KdlEntry::new(KdlValue::Bool(self.telemetry_disabled)));
        doc.nodes_mut().push(node);

        if let Some(ref token) = self.login_token {
            push_string(&mut doc, "login-token", token);
        }

        if let Some(ref version) = self.latest_version {
            push_string(&mut doc, "latest-version", version);
        }

        if let Some(ref checked_at) = self.update_checked_at {
            push_string(&mut doc, "update-checked-at", &checked_at.to_rfc3339());
        }

        doc
    }
}

/// Required permissions for config.kdl (Unix: 0600, owner read/write only).
#[cfg(unix)]
pub const CONFIG_FILE_MODE: u32 = 0o600;

/// Required permissions for the keel home and keystore directories.
#[cfg(unix)]
pub const CONFIG_DIR_MODE: u32 = 0o700;

/// Mask a secret, keeping the first and last 4 characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        let head: String = chars.iter().take(4).collect();
        format!("{}...", head)
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

fn string_node(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(|s| s.to_string())
}

fn push_string(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}
