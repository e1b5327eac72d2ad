//! Integration tests for first-run setup and `keel wallet`.

mod common;

use std::fs;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_first_run_creates_default_wallet() {
    let env = TestEnv::new();

    env.keel().args(["logout"]).assert().success();

    let config = env.config();
    let path = config.default_wallet_path.unwrap();
    let password = config.default_wallet_password.unwrap();

    assert!(path.starts_with(&env.home_path().join("keystore").display().to_string()));
    assert!(fs::metadata(&path).unwrap().is_file());
    assert_eq!(password.len(), 8);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn test_second_run_keeps_wallet() {
    let env = TestEnv::new();
    env.keel().args(["logout"]).assert().success();
    let first = env.config_text();

    env.keel().args(["logout"]).assert().success();

    assert_eq!(env.config_text(), first);
    assert_eq!(fs::read_dir(env.home_path().join("keystore")).unwrap().count(), 1);
}

#[test]
fn test_legacy_config_gets_empty_password() {
    let env = TestEnv::new();
    env.write_config("default-wallet-path \"/keys/legacy.json\"\n");

    env.keel().args(["logout"]).assert().success();

    let config = env.config();
    assert_eq!(config.default_wallet_path.as_deref(), Some("/keys/legacy.json"));
    assert_eq!(config.default_wallet_password.as_deref(), Some(""));
    assert!(!env.home_path().join("keystore").exists());
}

#[cfg(unix)]
#[test]
fn test_config_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let env = TestEnv::new();
    env.keel().args(["logout"]).assert().success();

    let mode = fs::metadata(env.config_path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_wallet_create_in_directory() {
    let env = TestEnv::new();

    env.keel()
        .args(["wallet", "create", "-d", "wallets", "--password", "s3cret"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Created wallet "));

    let created: Vec<_> = fs::read_dir(env.work_path().join("wallets"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(created.len(), 1);
    assert!(created[0].starts_with("UTC--"));

    let wallet: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(env.work_path().join("wallets").join(&created[0])).unwrap(),
    )
    .unwrap();
    assert_eq!(wallet["crypto"]["kdf"], "argon2id");
}

#[test]
fn test_wallet_default_used_by_run() {
    let env = TestEnv::new();
    fs::write(env.work_path().join("mine.json"), "{}").unwrap();

    env.keel()
        .args(["wallet", "default", "mine.json", "--password", "pw"])
        .assert()
        .success();

    let mount = format!("-v {}:/root/key", env.work_path().canonicalize().unwrap().display());
    env.keel()
        .args(["docker", "run", "sepolia", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DAPP_WALLET_PATH=/root/key/mine.json"))
        .stdout(predicate::str::contains(mount))
        .stdout(predicate::str::contains("DAPP_WALLET_PASSWORD=pw "));
}

#[test]
fn test_wallet_default_missing_file() {
    let env = TestEnv::new();

    env.keel()
        .args(["wallet", "default", "nope.json", "--password", ""])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("wallet file not found"));
}
