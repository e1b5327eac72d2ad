//! Credential selection for commands that sign on behalf of the user.
//!
//! A command may be handed several credential options at once. They are
//! collapsed into a single [`CredentialSpec`] by fixed precedence, then
//! [`resolve`] turns that request (or the configured default wallet) into exactly
//! one [`ResolvedCredential`]:
//!
//! 1. explicit wallet path (password may be empty)
//! 2. non-empty raw private key
//! 3. non-empty wallet JSON
//! 4. the configured default wallet

use std::path::{Path, PathBuf};

use crate::config::KeelConfig;
use crate::{Error, Result};

/// Raw credential options as supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOptions {
    pub wallet_path: Option<PathBuf>,
    pub wallet_password: String,
    pub private_key: String,
    pub wallet_json: String,
}

/// The one credential source a command asked for, or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSpec {
    Wallet { path: PathBuf, password: String },
    RawKey(String),
    Json(String),
    Unset,
}

impl CredentialSpec {
    /// Collapse raw options by precedence. Unused options are ignored.
    pub fn from_options(options: &CredentialOptions) -> Self {
        if let Some(path) = &options.wallet_path {
            return Self::Wallet {
                path: path.clone(),
                password: options.wallet_password.clone(),
            };
        }
        if !options.private_key.is_empty() {
            return Self::RawKey(options.private_key.clone());
        }
        if !options.wallet_json.is_empty() {
            return Self::Json(options.wallet_json.clone());
        }
        Self::Unset
    }

    /// Make a relative wallet path absolute against `base`.
    pub fn anchored_at(self, base: &Path) -> Self {
        match self {
            Self::Wallet { path, password } if path.is_relative() => Self::Wallet {
                path: base.join(path),
                password,
            },
            other => other,
        }
    }
}

/// A credential ready to be handed to the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCredential {
    Wallet { path: PathBuf, password: String },
    RawKey(String),
    Json(String),
}

impl ResolvedCredential {
    /// Short label for logs; never includes secret material.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Wallet { .. } => "wallet",
            Self::RawKey(_) => "private-key",
            Self::Json(_) => "wallet-json",
        }
    }
}

/// Resolve a requested credential against the configured default wallet.
///
/// Fails with [`Error::MissingCredential`] when nothing was supplied and no
/// default wallet is configured.
pub fn resolve(spec: CredentialSpec, config: &KeelConfig) -> Result<ResolvedCredential> {
    let resolved = match spec {
        CredentialSpec::Wallet { path, password } => ResolvedCredential::Wallet { path, password },
        CredentialSpec::RawKey(key) => ResolvedCredential::RawKey(key),
        CredentialSpec::Json(blob) => ResolvedCredential::Json(blob),
        CredentialSpec::Unset => {
            let path = config
                .default_wallet_path
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or(Error::MissingCredential)?;
            ResolvedCredential::Wallet {
                path: PathBuf::from(path),
                password: config.default_wallet_password.clone().unwrap_or_default(),
            }
        }
    };

    tracing::debug!(kind = resolved.kind(), "resolved credential");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_options() -> CredentialOptions {
        CredentialOptions {
            wallet_path: Some(PathBuf::from("/keys/w.json")),
            wallet_password: "pw".to_string(),
            private_key: "0xabc".to_string(),
            wallet_json: "{\"k\":1}".to_string(),
        }
    }

    fn configured() -> KeelConfig {
        KeelConfig {
            default_wallet_path: Some("/home/me/.keel/keystore/default.json".to_string()),
            default_wallet_password: Some("d3fault1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_wallet_path_wins_over_everything() {
        let spec = CredentialSpec::from_options(&all_options());
        assert_eq!(
            spec,
            CredentialSpec::Wallet {
                path: PathBuf::from("/keys/w.json"),
                password: "pw".to_string()
            }
        );
    }

    #[test]
    fn test_wallet_path_with_empty_password() {
        let options = CredentialOptions {
            wallet_path: Some(PathBuf::from("/keys/w.json")),
            private_key: "0xabc".to_string(),
            ..Default::default()
        };
        let resolved = resolve(CredentialSpec::from_options(&options), &configured()).unwrap();
        assert_eq!(
            resolved,
            ResolvedCredential::Wallet {
                path: PathBuf::from("/keys/w.json"),
                password: String::new()
            }
        );
    }

    #[test]
    fn test_raw_key_wins_over_json() {
        let options = CredentialOptions {
            wallet_path: None,
            ..all_options()
        };
        assert_eq!(
            CredentialSpec::from_options(&options),
            CredentialSpec::RawKey("0xabc".to_string())
        );
    }

    #[test]
    fn test_json_when_only_json() {
        let options = CredentialOptions {
            wallet_json: "{\"k\":1}".to_string(),
            wallet_password: "ignored".to_string(),
            ..Default::default()
        };
        let resolved = resolve(CredentialSpec::from_options(&options), &configured()).unwrap();
        assert_eq!(resolved, ResolvedCredential::Json("{\"k\":1}".to_string()));
    }

    #[test]
    fn test_password_alone_falls_back_to_default() {
        let options = CredentialOptions {
            wallet_password: "orphan".to_string(),
            ..Default::default()
        };
        let resolved = resolve(CredentialSpec::from_options(&options), &configured()).unwrap();
        assert_eq!(
            resolved,
            ResolvedCredential::Wallet {
                path: PathBuf::from("/home/me/.keel/keystore/default.json"),
                password: "d3fault1".to_string()
            }
        );
    }

    #[test]
    fn test_default_wallet_without_password_uses_empty() {
        let config = KeelConfig {
            default_wallet_path: Some("/w.json".to_string()),
            ..Default::default()
        };
        let resolved = resolve(CredentialSpec::Unset, &config).unwrap();
        assert_eq!(
            resolved,
            ResolvedCredential::Wallet {
                path: PathBuf::from("/w.json"),
                password: String::new()
            }
        );
    }

    #[test]
    fn test_nothing_resolvable_is_an_error() {
        let result = resolve(CredentialSpec::Unset, &KeelConfig::default());
        assert!(matches!(result, Err(Error::MissingCredential)));

        let empty_path = KeelConfig {
            default_wallet_path: Some(String::new()),
            default_wallet_password: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            resolve(CredentialSpec::Unset, &empty_path),
            Err(Error::MissingCredential)
        ));
    }

    #[test]
    fn test_anchored_at_only_touches_relative_wallets() {
        let base = Path::new("/work");
        let relative = CredentialSpec::Wallet {
            path: PathBuf::from("keys/w.json"),
            password: String::new(),
        };
        assert_eq!(
            relative.anchored_at(base),
            CredentialSpec::Wallet {
                path: PathBuf::from("/work/keys/w.json"),
                password: String::new()
            }
        );

        let raw = CredentialSpec::RawKey("0x1".to_string());
        assert_eq!(raw.clone().anchored_at(base), raw);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ResolvedCredential::RawKey("k".into()).kind(), "private-key");
        assert_eq!(ResolvedCredential::Json("j".into()).kind(), "wallet-json");
    }
}
