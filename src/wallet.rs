//! Encrypted wallet files.
//!
//! A wallet is a random 32-byte secret key encrypted under a password:
//! Argon2id derives the encryption key from the password and a per-file salt,
//! XChaCha20-Poly1305 seals the secret. Everything binary is hex in the JSON.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::ensure_private_dir;
use crate::{Error, Result};

/// Current wallet file format version.
pub const WALLET_VERSION: u32 = 1;

/// Directory under the keel home where generated wallets live.
pub const KEYSTORE_DIR_NAME: &str = "keystore";

const SECRET_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;

#[cfg(unix)]
const WALLET_FILE_MODE: u32 = 0o600;

/// Creates a new wallet file and returns where it was written.
pub trait WalletCreator {
    fn create_wallet(&self, dir: &Path, password: &str) -> Result<PathBuf>;
}

/// [`WalletCreator`] writing [`WalletFile`]s to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeystoreWalletCreator;

impl WalletCreator for KeystoreWalletCreator {
    fn create_wallet(&self, dir: &Path, password: &str) -> Result<PathBuf> {
        let mut secret = [0u8; SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut secret);

        let file = WalletFile::seal(&secret, password)?;
        let path = dir.join(file.file_name());
        file.write_to(&path)?;

        tracing::info!(path = %path.display(), "created wallet");
        Ok(path)
    }
}

/// KDF and cipher parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoParams {
    pub kdf: String,
    pub salt: String,
    pub cipher: String,
    pub nonce: String,
    pub ciphertext: String,
}

/// On-disk wallet file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFile {
    pub version: u32,
    pub id: String,
    pub created_at: String,
    pub crypto: CryptoParams,
}

impl WalletFile {
    /// Encrypt `secret` under `password`. An empty password is allowed.
    pub fn seal(secret: &[u8], password: &str) -> Result<Self> {
        let mut rng = rand::rngs::OsRng;
        let mut salt = [0u8; SALT_LEN];
        rng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        let key = derive_key(password, &salt)?;
        let cipher = XChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| Error::Wallet(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), secret)
            .map_err(|e| Error::Wallet(format!("encryption failed: {}", e)))?;

        Ok(Self {
            version: WALLET_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now().to_rfc3339(),
            crypto: CryptoParams {
                kdf: "argon2id".to_string(),
                salt: hex::encode(salt),
                cipher: "xchacha20-poly1305".to_string(),
                nonce: hex::encode(nonce),
                ciphertext: hex::encode(ciphertext),
            },
        })
    }

    /// Decrypt the secret key.
    pub fn unseal(&self, password: &str) -> Result<Vec<u8>> {
        let salt = decode_hex("salt", &self.crypto.salt)?;
        let nonce = decode_hex("nonce", &self.crypto.nonce)?;
        let ciphertext = decode_hex("ciphertext", &self.crypto.ciphertext)?;
        if nonce.len() != NONCE_LEN {
            return Err(Error::Wallet("invalid nonce length".to_string()));
        }

        let key = derive_key(password, &salt)?;
        let cipher = XChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| Error::Wallet(e.to_string()))?;
        cipher
            .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| Error::Wallet("wrong password or corrupted wallet".to_string()))
    }

    /// `UTC--<timestamp>--<id>.json`
    pub fn file_name(&self) -> String {
        format!(
            "UTC--{}--{}.json",
            Utc::now().format("%Y-%m-%dT%H-%M-%S%.3fZ"),
            self.id
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_private_dir(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(WALLET_FILE_MODE);
        }
        let mut file = options.open(path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let mut key = [0u8; 32];
    argon2::Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| Error::Wallet(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| Error::Wallet(format!("invalid {}: {}", field, e)))
}
