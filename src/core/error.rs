use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::github::RateLimitInfo;

/// Central error type for the mirror backend.
/// Every module returns `Result<T, MirrorError>`.
#[derive(Debug, Error)]
pub enum MirrorError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Download failed for {url} after {attempts} attempts: {reason}")]
    DownloadExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    // ── Repository resolution ───────────────────────────
    #[error("Invalid source url {url}: {reason}")]
    InvalidSourceUrl { url: String, reason: String },

    #[error("No repository link found on {source_url}")]
    RepositoryNotFound { source_url: String },

    #[error("Invalid repo selector {rule:?}: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Not a repository url: {0}")]
    InvalidRepositoryUrl(String),

    #[error("Source page {url} returned HTTP {status}")]
    PageFetchFailed { url: String, status: u16 },

    // ── Upstream API ────────────────────────────────────
    #[error("No published release for {0}")]
    ReleaseNotFound(String),

    #[error("Upstream rate limit exhausted (remaining {:?}, reset {:?})", .0.remaining, .0.reset_at)]
    RateLimited(RateLimitInfo),

    #[error("Release metadata fetch for {repo} failed: HTTP {status}")]
    FetchFailed { repo: String, status: u16 },

    // ── Storage ─────────────────────────────────────────
    #[error("Refusing to store release under version {0:?}")]
    InvalidVersion(String),

    // ── Scan ────────────────────────────────────────────
    #[error("Launcher {launcher} exceeded its {timeout:?} deadline")]
    Timeout { launcher: String, timeout: Duration },

    // ── Config ──────────────────────────────────────────
    #[error("Config error: {0}")]
    Config(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type MirrorResult<T> = Result<T, MirrorError>;

impl From<std::io::Error> for MirrorError {
    fn from(source: std::io::Error) -> Self {
        MirrorError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl MirrorError {
    /// Wraps an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Io {
            path: path.into(),
            source,
        }
    }
}
