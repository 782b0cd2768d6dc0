use std::sync::Arc;

use tracing::{info, warn};

use crate::core::config::MirrorConfig;
use crate::core::downloader::Downloader;
use crate::core::error::MirrorResult;
use crate::core::github::ReleaseFetcher;
use crate::core::http::{build_download_client, build_http_client, APP_USER_AGENT};
use crate::core::resolver::RepositoryResolver;
use crate::core::scan::{LauncherPipeline, MirrorPipeline, Scanner};
use crate::core::version::VersionIndex;

/// Everything the scheduler and the HTTP API share.
pub struct AppState {
    pub config: MirrorConfig,
    pub index: Arc<VersionIndex>,
    pub scanner: Arc<Scanner>,
}

impl AppState {
    /// Wire the production pipeline from `config`.
    pub fn new(config: MirrorConfig) -> MirrorResult<Self> {
        let resolver = RepositoryResolver::new(APP_USER_AGENT)?;
        let fetcher = ReleaseFetcher::new(
            build_http_client()?,
            config.github_api_base.clone(),
            config.github_token.clone(),
        );
        let downloader = Downloader::new(
            build_download_client(config.proxy_url.as_deref())?,
            config.rewrite_rules(),
        );
        let pipeline = MirrorPipeline::new(
            resolver,
            fetcher,
            downloader,
            config.storage_path.clone(),
        );
        Ok(Self::with_pipeline(config, Arc::new(pipeline)))
    }

    pub fn with_pipeline(config: MirrorConfig, pipeline: Arc<dyn LauncherPipeline>) -> Self {
        let index = Arc::new(VersionIndex::new());
        let scanner = Arc::new(Scanner::new(
            config.launchers.clone(),
            pipeline,
            Arc::clone(&index),
            config.task_timeout(),
        ));
        Self {
            config,
            index,
            scanner,
        }
    }

    /// Register whatever is already on disk. A broken storage root is logged
    /// and left for the scans to repopulate.
    pub fn bootstrap_index(&self) -> usize {
        match self.index.bootstrap(&self.config.storage_path) {
            Ok(count) => {
                info!(
                    "Indexed {} existing versions under {:?}",
                    count, self.config.storage_path
                );
                count
            }
            Err(e) => {
                warn!("Could not index existing downloads: {}", e);
                0
            }
        }
    }
}
