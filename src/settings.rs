use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

use crate::download::DownloadSettings;
use crate::retry::{Backoff, RetryPolicy};
use crate::session::cookies::CookieCache;

const CONFIG_FILE: &str = "manuscript_merge";
const ENV_PREFIX: &str = "MERGE";

/// Run settings: defaults, then `manuscript_merge.toml`, then `MERGE_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input: PathBuf,
    pub download_root: PathBuf,
    pub snapshot_root: PathBuf,
    pub cookie_file: PathBuf,
    pub cookie_ttl_secs: u64,
    pub download_timeout_secs: u64,
    pub download_poll_ms: u64,
    pub download_attempts: u32,
    pub retry_delay_ms: u64,
    pub retry_exponential: bool,
    pub settle_delay_secs: u64,
    pub author_instructions_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: "articles.csv".into(),
            download_root: "downloads".into(),
            snapshot_root: "snapshots".into(),
            cookie_file: "session_cookies.json".into(),
            cookie_ttl_secs: 30 * 60,
            download_timeout_secs: 60,
            download_poll_ms: 1000,
            download_attempts: 3,
            retry_delay_ms: 2000,
            retry_exponential: false,
            settle_delay_secs: 5,
            author_instructions_base: "https://journals.sagepub.com/author-instructions".into(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let delay = Duration::from_millis(self.retry_delay_ms);
        if self.retry_exponential {
            RetryPolicy {
                max_attempts: self.download_attempts.max(1),
                backoff: Backoff::Exponential { base: delay },
            }
        } else {
            RetryPolicy::fixed(self.download_attempts, delay)
        }
    }

    pub fn download(&self) -> DownloadSettings {
        DownloadSettings {
            timeout: Duration::from_secs(self.download_timeout_secs),
            poll: Duration::from_millis(self.download_poll_ms),
            retry: self.retry_policy(),
        }
    }

    pub fn cookie_cache(&self) -> CookieCache {
        CookieCache::new(&self.cookie_file, Duration::from_secs(self.cookie_ttl_secs))
    }
}

// ── Tests ──
