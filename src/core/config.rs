use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::RewriteRules;
use crate::core::error::{MirrorError, MirrorResult};
use crate::core::github::DEFAULT_API_BASE;
use crate::core::release::is_safe_path_segment;
use crate::core::resolver::MatchRule;

pub const CONFIG_FILE: &str = "config.json";
pub const CONFIG_ENV: &str = "LAUNCHER_MIRROR_CONFIG";
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
/// Upper bound for every `*_minutes` setting: one year.
pub const MAX_MINUTES: u64 = 365 * 24 * 60;

/// One tracked launcher: where to look for its repository and how.
#[derive(Debug, Clone, Deserialize)]
pub struct LauncherConfig {
    pub name: String,
    pub source_url: String,
    /// Empty for the default matcher, `regex:<pattern>`, or a CSS selector.
    #[serde(default)]
    pub repo_selector: MatchRule,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    pub storage_path: PathBuf,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default = "default_api_base")]
    pub github_api_base: String,
    /// Proxy for asset downloads.
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Prefix glued in front of every asset URL.
    #[serde(default)]
    pub asset_proxy_url: Option<String>,
    #[serde(default)]
    pub mirror_enabled: bool,
    #[serde(default)]
    pub mirror_domain: Option<String>,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_minutes: u64,
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u64,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub launchers: Vec<LauncherConfig>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_download_timeout() -> u64 {
    60
}

fn default_check_interval() -> u64 {
    10
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl MirrorConfig {
    /// Load from `$LAUNCHER_MIRROR_CONFIG`, else `config.json` in the working directory.
    pub fn load() -> MirrorResult<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let token = std::env::var(TOKEN_ENV).ok();
        Self::load_from(&path, token)
    }

    /// Load and validate `path`. A non-empty `env_token` replaces the file's token.
    pub fn load_from(path: &Path, env_token: Option<String>) -> MirrorResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| MirrorError::io(path, e))?;
        let mut config = Self::from_json(&raw)?;
        if let Some(token) = env_token.filter(|t| !t.is_empty()) {
            config.github_token = Some(token);
        }
        info!(
            "Loaded config from {:?}: {} launchers",
            path,
            config.launchers.len()
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> MirrorResult<Self> {
        let config: MirrorConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> MirrorResult<()> {
        if self.storage_path.as_os_str().is_empty() {
            return Err(MirrorError::Config("storage_path must not be empty".into()));
        }
        if self.download_timeout_minutes == 0 {
            return Err(MirrorError::Config(
                "download_timeout_minutes must be greater than 0".into(),
            ));
        }
        if self.check_interval_minutes == 0 {
            return Err(MirrorError::Config(
                "check_interval_minutes must be greater than 0".into(),
            ));
        }
        if self.download_timeout_minutes > MAX_MINUTES || self.check_interval_minutes > MAX_MINUTES {
            return Err(MirrorError::Config(format!(
                "minute settings must not exceed {MAX_MINUTES}"
            )));
        }
        if self.mirror_enabled && self.mirror_domain.as_deref().unwrap_or("").is_empty() {
            return Err(MirrorError::Config(
                "mirror_enabled requires mirror_domain".into(),
            ));
        }

        let mut seen = HashSet::new();
        for launcher in &self.launchers {
            if !is_safe_path_segment(&launcher.name) {
                return Err(MirrorError::Config(format!(
                    "launcher name {:?} must be a single directory name",
                    launcher.name
                )));
            }
            if !seen.insert(launcher.name.as_str()) {
                return Err(MirrorError::Config(format!(
                    "launcher {:?} is configured twice",
                    launcher.name
                )));
            }
        }
        Ok(())
    }

    /// Deadline for one launcher's resolve -> fetch -> download run.
    pub fn task_timeout(&self) -> Duration {
        minutes(self.download_timeout_minutes)
    }

    pub fn check_interval(&self) -> Duration {
        minutes(self.check_interval_minutes)
    }

    pub fn rewrite_rules(&self) -> RewriteRules {
        RewriteRules {
            asset_proxy: self.asset_proxy_url.clone().filter(|s| !s.is_empty()),
            mirror_domain: self.mirror_domain.clone().filter(|s| !s.is_empty()),
            mirror_enabled: self.mirror_enabled,
        }
    }
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}
