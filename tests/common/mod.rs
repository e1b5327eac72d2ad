//! Common test utilities for keel integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.keel/` directory or the network.

#![allow(dead_code)]

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with an isolated keel home.
///
/// Each `TestEnv` creates two temporary directories:
/// - `work_dir`: the directory commands run in
/// - `home_dir`: keel's home (via `KEEL_HOME`)
///
/// The `keel()` method returns a `Command` with telemetry disabled and both
/// web endpoints pointed at a closed local port, set per-invocation so tests
/// stay parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub home_dir: TempDir,
    dead_url: String,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            home_dir: TempDir::new().unwrap(),
            dead_url: unreachable_url(),
        }
    }

    /// Get a Command for the keel binary with an isolated home.
    pub fn keel(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_keel"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("KEEL_HOME", self.home_dir.path());
        cmd.env("KEEL_TELEMETRY_DISABLED", "1");
        cmd.env("KEEL_TELEMETRY_URL", &self.dead_url);
        cmd.env("KEEL_UPDATE_URL", &self.dead_url);
        cmd.env_remove("KEEL_LOG");
        cmd
    }

    pub fn work_path(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn home_path(&self) -> &Path {
        self.home_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.home_path().join("config.kdl")
    }

    pub fn config_text(&self) -> String {
        fs::read_to_string(self.config_path()).unwrap_or_default()
    }

    /// The stored configuration, read the way keel reads it.
    pub fn config(&self) -> keel::config::KeelConfig {
        keel::config::ConfigStore::load(self.config_path())
            .unwrap()
            .config()
            .clone()
    }

    /// Write config.kdl directly.
    pub fn write_config(&self, content: &str) {
        fs::write(self.config_path(), content).unwrap();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A local URL nothing listens on.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    url
}

/// A local HTTP endpoint answering every request with `200 {}`.
///
/// Each request body is sent on the returned channel, in arrival order.
pub fn collecting_endpoint() -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let Ok(clone) = stream.try_clone() else { continue };
            let mut reader = BufReader::new(clone);

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
            }

            let mut body = vec![0u8; content_length];
            if reader.read_exact(&mut body).is_err() {
                continue;
            }
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
            );
            if tx.send(String::from_utf8_lossy(&body).into_owned()).is_err() {
                break;
            }
        }
    });

    (url, rx)
}
