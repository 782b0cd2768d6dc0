use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::rate_limit::RateLimitInfo;
use crate::core::error::{MirrorError, MirrorResult};
use crate::core::release::{AssetDescriptor, ReleaseDescriptor};
use crate::core::resolver::RepositoryIdentity;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

/// `GET /repos/{owner}/{repo}/releases/latest` payload, reduced to what we keep.
#[derive(Debug, Deserialize)]
struct LatestReleasePayload {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<AssetPayload>,
}

#[derive(Debug, Deserialize)]
struct AssetPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    browser_download_url: String,
    #[serde(default)]
    size: u64,
}

impl LatestReleasePayload {
    fn into_descriptor(self, launcher: &str) -> ReleaseDescriptor {
        ReleaseDescriptor {
            launcher_name: launcher.to_string(),
            tag: self.tag_name.unwrap_or_default(),
            display_name: self.name.unwrap_or_default(),
            published_at: self.published_at,
            assets: self
                .assets
                .into_iter()
                .map(|a| AssetDescriptor {
                    name: a.name,
                    download_url: a.browser_download_url,
                    size_bytes: a.size,
                })
                .collect(),
            release_id: self.id,
        }
    }
}

/// Retrieves the latest release of a repository from the upstream API.
///
/// One request per call; no release listing, no pagination.
pub struct ReleaseFetcher {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl ReleaseFetcher {
    pub fn new(client: Client, api_base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub async fn latest_release(
        &self,
        launcher: &str,
        repo: &RepositoryIdentity,
    ) -> MirrorResult<(ReleaseDescriptor, RateLimitInfo)> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base, repo.owner, repo.repo
        );

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        let rate = RateLimitInfo::from_headers(response.headers());
        debug!(
            "Latest release for {}: HTTP {} (quota remaining {:?})",
            repo, status, rate.remaining
        );

        if status.is_success() {
            let payload: LatestReleasePayload = response.json().await?;
            return Ok((payload.into_descriptor(launcher), rate));
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(MirrorError::RateLimited(rate)),
            StatusCode::FORBIDDEN if rate.is_exhausted() => Err(MirrorError::RateLimited(rate)),
            StatusCode::NOT_FOUND => Err(MirrorError::ReleaseNotFound(repo.to_string())),
            _ => Err(MirrorError::FetchFailed {
                repo: repo.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}
