//! Configuration and state management for keel.
//!
//! ## config.kdl - persisted settings (machine-specific, contains secrets)
//!
//! Located at `~/.keel/config.kdl` (or `$KEEL_HOME/config.kdl`).
//!
//! Contains:
//! - `default-wallet-path` / `default-wallet-password` - wallet used when no
//!   credential is given on the command line
//! - `telemetry-disabled` - opt-out flag for usage reporting
//! - `login-token` - account token from `keel login`
//! - `latest-version` / `update-checked-at` - update-check cache
//!
//! ## Security
//!
//! **CRITICAL**: `config.kdl` MUST be written with 0600 permissions (owner
//! read/write only) because it contains the default wallet password and the
//! login token.
//!
//! ## Precedence
//!
//! Use the [`resolver`] module for environment > config > default resolution.

pub mod resolver;
pub mod schema;
pub mod store;

pub use resolver::{
    Endpoints, KEEL_HOME_ENV, Resolved, ResolvedSettings, TELEMETRY_DISABLED_ENV,
    TELEMETRY_URL_ENV, UPDATE_URL_ENV, ValueSource, resolve_home, resolve_telemetry_disabled,
};
pub use schema::{KeelConfig, mask_secret};
#[cfg(unix)]
pub use schema::{CONFIG_DIR_MODE, CONFIG_FILE_MODE};
pub use store::{CONFIG_FILE_NAME, ConfigStore, ensure_private_dir};
