//! CLI configuration.
//!
//! Settings come from a JSON file (`~/.config/chunkwise/config.json` unless
//! `--config` names another) and are then overridden by command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chunkwise_queue::UploaderConfig;
use serde::{Deserialize, Serialize};

/// Effective CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Chunk upload URL; finalize goes to `<endpoint>/finalize`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bearer token sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout in seconds; 0 disables it.
    pub timeout_secs: u64,

    /// Automatic retries of failed items before giving up.
    pub retries: u32,

    /// Queue settings, flattened into the top-level object.
    #[serde(flatten)]
    pub uploader: UploaderConfig,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub chunk_size: Option<usize>,
    pub max_size: Option<u64>,
    pub max_files: Option<usize>,
    pub accept: Option<String>,
    pub checksums: bool,
    pub resume: bool,
}

impl CliConfig {
    /// Loads `path`, or the default location when `None`.
    ///
    /// A missing file yields defaults. A file that fails to parse is
    /// logged and ignored.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<CliConfig>(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if overrides.endpoint.is_some() {
            self.endpoint = overrides.endpoint;
        }
        if overrides.token.is_some() {
            self.token = overrides.token;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(retries) = overrides.retries {
            self.retries = retries;
        }
        if let Some(size) = overrides.chunk_size {
            self.uploader.chunk_size_bytes = size;
        }
        if let Some(max) = overrides.max_size {
            self.uploader.max_size_bytes = max;
        }
        if let Some(max) = overrides.max_files {
            self.uploader.max_files = max;
        }
        if overrides.accept.is_some() {
            self.uploader.accept = overrides.accept;
        }
        self.uploader.chunk_checksums |= overrides.checksums;
        self.uploader.resume_failed_uploads |= overrides.resume;
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("chunkwise").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Ok(dir) = std::env::var("XDG_CONFIG_HOME")
            && !dir.is_empty()
        {
            return Ok(PathBuf::from(dir));
        }
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME is not set; pass --config"))?;
        Ok(PathBuf::from(home).join(".config"))
    }
}
