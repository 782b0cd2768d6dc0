use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::core::config::LauncherConfig;
use crate::core::downloader::Downloader;
use crate::core::error::{MirrorError, MirrorResult};
use crate::core::github::{RateLimitInfo, ReleaseFetcher};
use crate::core::release::{MirrorRecord, ReleaseDescriptor};
use crate::core::resolver::{RepositoryIdentity, RepositoryResolver};

/// Everything one launcher goes through during a scan.
#[async_trait]
pub trait LauncherPipeline: Send + Sync {
    async fn sync(&self, target: &LauncherConfig) -> MirrorResult<MirrorRecord>;
}

/// Resolve the repository, fetch its latest release, mirror the assets.
pub struct MirrorPipeline {
    resolver: RepositoryResolver,
    fetcher: ReleaseFetcher,
    downloader: Downloader,
    destination_root: PathBuf,
}

impl MirrorPipeline {
    pub fn new(
        resolver: RepositoryResolver,
        fetcher: ReleaseFetcher,
        downloader: Downloader,
        destination_root: PathBuf,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            downloader,
            destination_root,
        }
    }
}

impl MirrorPipeline {
    /// Latest release, waiting out an exhausted quota once when the reset is
    /// close enough. A second rate limit after the wait is returned as is.
    async fn fetch_release(
        &self,
        launcher: &str,
        repo: &RepositoryIdentity,
    ) -> MirrorResult<ReleaseDescriptor> {
        match self.fetcher.latest_release(launcher, repo).await {
            Ok((release, _)) => Ok(release),
            Err(MirrorError::RateLimited(rate)) => {
                if !wait_for_quota(launcher, &rate).await {
                    return Err(MirrorError::RateLimited(rate));
                }
                info!(launcher = %launcher, "Quota reset, fetching the latest release again");
                let (release, _) = self.fetcher.latest_release(launcher, repo).await?;
                Ok(release)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl LauncherPipeline for MirrorPipeline {
    async fn sync(&self, target: &LauncherConfig) -> MirrorResult<MirrorRecord> {
        let repo = self
            .resolver
            .resolve(&target.source_url, &target.repo_selector)
            .await?;
        info!(launcher = %target.name, "Using repository {}", repo.html_url());

        let release = self.fetch_release(&target.name, &repo).await?;

        let version = release
            .version()
            .ok_or_else(|| MirrorError::InvalidVersion(String::new()))?;
        let manifest_path = self
            .downloader
            .materialize(&release, &self.destination_root)
            .await?;

        Ok(MirrorRecord {
            launcher: target.name.clone(),
            version,
            manifest_path,
        })
    }
}

/// Sleep until the quota resets when that is close enough and report
/// whether it did. The sleep counts against the task deadline.
async fn wait_for_quota(launcher: &str, rate: &RateLimitInfo) -> bool {
    match rate.backoff(Utc::now()) {
        Some(wait) => {
            warn!(launcher = %launcher, "Rate limited, waiting {:?} for the quota to reset", wait);
            tokio::time::sleep(wait).await;
            true
        }
        None => {
            warn!(
                launcher = %launcher,
                "Rate limited until {:?}, deferring to the next scan",
                rate.reset_at
            );
            false
        }
    }
}
