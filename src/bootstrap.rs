//! First-run setup, run before every command.
//!
//! | State | Condition | Action |
//! |---|---|---|
//! | A | no default wallet path | create a wallet with a random password, record both |
//! | B | path but no password (older config files) | record an empty password |
//! | C | path and password | nothing |
//!
//! Both checks are no-ops once state C is reached.

use std::path::Path;

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::Result;
use crate::config::ConfigStore;
use crate::wallet::{KEYSTORE_DIR_NAME, WalletCreator};

/// Length of generated default-wallet passwords.
pub const GENERATED_PASSWORD_LEN: usize = 8;

/// What bootstrap did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapAction {
    CreatedWallet,
    HealedPassword,
    None,
}

/// Bring the configuration to the fully configured state.
pub fn ensure_configured(
    store: &mut ConfigStore,
    home: &Path,
    wallets: &dyn WalletCreator,
) -> Result<BootstrapAction> {
    if !store.config().has_default_wallet() {
        let password = generate_password();
        let path = wallets.create_wallet(&home.join(KEYSTORE_DIR_NAME), &password)?;
        store.set_default_wallet(&path, &password)?;
        tracing::info!(path = %path.display(), "created default wallet");
        return Ok(BootstrapAction::CreatedWallet);
    }

    if store.config().is_legacy_wallet_state() {
        store.set_default_wallet_password("")?;
        tracing::info!("recorded empty default wallet password");
        return Ok(BootstrapAction::HealedPassword);
    }

    Ok(BootstrapAction::None)
}

/// Random alphanumeric password of [`GENERATED_PASSWORD_LEN`] characters.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
