use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::error::{MirrorError, MirrorResult};

/// Canonical `owner/repo` pair on the upstream host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub repo: String,
}

impl RepositoryIdentity {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// First two path segments of `url` when it lives on the upstream host.
    ///
    /// Any further segments (`/releases`, `/tree/main`, ...) are ignored.
    pub fn from_repository_url(url: &str) -> MirrorResult<Self> {
        let parsed =
            Url::parse(url).map_err(|_| MirrorError::InvalidRepositoryUrl(url.to_string()))?;
        if !is_upstream_host(parsed.host_str()) {
            return Err(MirrorError::InvalidRepositoryUrl(url.to_string()));
        }
        Self::from_path(parsed.path()).ok_or_else(|| MirrorError::InvalidRepositoryUrl(url.to_string()))
    }

    pub(crate) fn from_path(path: &str) -> Option<Self> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let owner = segments.next()?;
        let repo = segments.next()?;
        Some(Self::new(owner, repo))
    }

    pub fn html_url(&self) -> String {
        format!("https://{}/{}/{}", super::UPSTREAM_HOST, self.owner, self.repo)
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

pub(crate) fn is_upstream_host(host: Option<&str>) -> bool {
    matches!(host, Some(h) if h.eq_ignore_ascii_case(super::UPSTREAM_HOST)
        || h.eq_ignore_ascii_case(&format!("www.{}", super::UPSTREAM_HOST)))
}
