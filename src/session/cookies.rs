use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            expiry: None,
        }
    }
}

/// Session cookies on disk, valid for `ttl` after the file was written.
#[derive(Debug, Clone)]
pub struct CookieCache {
    path: PathBuf,
    ttl: Duration,
}

impl CookieCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time since the cache file was last written.
    pub fn age(&self) -> Option<Duration> {
        let modified = std::fs::metadata(&self.path).ok()?.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// Cookies from a cache younger than the ttl. A stale cache is deleted.
    pub fn load_fresh(&self) -> Option<Vec<Cookie>> {
        let age = self.age()?;
        if age >= self.ttl {
            info!(
                "Cookie file expired ({:.1} minutes old), deleting",
                age.as_secs_f64() / 60.0
            );
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Could not delete {}: {}", self.path.display(), e);
            }
            return None;
        }

        info!(
            "Cookie file is {:.1} minutes old (valid for {} minutes)",
            age.as_secs_f64() / 60.0,
            self.ttl.as_secs() / 60
        );
        match self.read() {
            Ok(cookies) => Some(cookies),
            Err(e) => {
                warn!("Error loading cookies: {:#}", e);
                None
            }
        }
    }

    fn read(&self) -> Result<Vec<Cookie>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&raw).context("parsing cookie cache")
    }

    pub fn save(&self, cookies: &[Cookie]) -> Result<()> {
        let json = serde_json::to_string_pretty(cookies)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

// ── Tests ──
