//! Release checks.
//!
//! The latest published version is cached in config.kdl together with the
//! time it was fetched. The interactive check only goes to the network when
//! the cache is older than [`CACHE_TTL_HOURS`].

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::Result;
use crate::config::ConfigStore;

/// How long a cached latest-version answer is trusted.
pub const CACHE_TTL_HOURS: i64 = 24;

/// Version of the running binary.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Checks for newer releases. Never fails the caller.
pub trait UpdateChecker {
    /// Refresh a stale cache, then tell the user about a newer release.
    fn prompt_if_update_available(&self, store: &mut ConfigStore);

    /// Refresh the cache unconditionally, silently.
    fn online_update_check(&self, store: &mut ConfigStore);
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    version: String,
}

/// [`UpdateChecker`] backed by the release endpoint.
#[derive(Debug, Clone)]
pub struct HttpUpdateChecker {
    agent: ureq::Agent,
    url: String,
    current: String,
}

impl HttpUpdateChecker {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            agent: super::agent(),
            url: url.into(),
            current: CURRENT_VERSION.to_string(),
        }
    }

    /// Fetch the latest published version.
    pub fn fetch_latest(&self) -> Result<String> {
        let release: LatestRelease = self
            .agent
            .get(&self.url)
            .call()
            .map_err(super::http_error)?
            .into_json()?;
        Ok(release.version)
    }

    fn refresh(&self, store: &mut ConfigStore) {
        let latest = match self.fetch_latest() {
            Ok(latest) => latest,
            Err(e) => {
                tracing::debug!(error = %e, "update check failed");
                return;
            }
        };
        if let Err(e) = store.record_latest_version(&latest, Utc::now()) {
            tracing::warn!(error = %e, "failed to cache latest version");
        }
    }
}

impl UpdateChecker for HttpUpdateChecker {
    fn prompt_if_update_available(&self, store: &mut ConfigStore) {
        if cache_is_stale(store.config().update_checked_at, Utc::now()) {
            self.refresh(store);
        }

        if let Some(latest) = store.config().latest_version.as_deref() {
            if is_newer(latest, &self.current) {
                eprintln!(
                    "A new version of keel is available: {} (installed: {})",
                    latest, self.current
                );
            }
        }
    }

    fn online_update_check(&self, store: &mut ConfigStore) {
        self.refresh(store);
    }
}

/// A cache with no timestamp is always stale.
pub fn cache_is_stale(checked_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match checked_at {
        Some(checked_at) => now - checked_at >= Duration::hours(CACHE_TTL_HOURS),
        None => true,
    }
}

/// Compare dotted numeric versions; a leading `v` is ignored.
///
/// Unparseable versions never count as newer.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    match (parse_version(candidate), parse_version(current)) {
        (Some(candidate), Some(current)) => compare(&candidate, &current) == Ordering::Greater,
        _ => false,
    }
}

fn parse_version(version: &str) -> Option<Vec<u64>> {
    let version = version.trim().trim_start_matches('v');
    let core = version.split(['-', '+']).next()?;
    core.split('.').map(|part| part.parse().ok()).collect()
}

fn compare(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
