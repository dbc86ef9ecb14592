use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Deployment used when `JOBTRACK_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/";

pub struct ClientConfig {
    /// Base address of the remote service. Endpoint paths are joined beneath it.
    pub base_url: String,
    pub timeout: Duration,
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("JOBTRACK_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.into()),
            timeout: std::env::var("JOBTRACK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(15)),
            data_dir: std::env::var("JOBTRACK_DATA_DIR").ok().map(PathBuf::from),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The base URL with a guaranteed trailing slash.
    pub fn normalized_base_url(&self) -> String {
        let trimmed = self.base_url.trim();
        if trimmed.ends_with('/') {
            trimmed.to_owned()
        } else {
            format!("{trimmed}/")
        }
    }
}

/// Resolve (and create) the directory holding persisted session state.
pub fn resolve_data_dir(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(d) => d.clone(),
        None => directories::ProjectDirs::from("dev", "jobtrack", "jobtrack")
            .context("could not determine a home directory for session data")?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("create data dir {}", dir.display()))?;
    Ok(dir)
}
