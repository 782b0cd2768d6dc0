use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::progress::ProgressReporter;
use super::rewrite::RewriteRules;
use crate::core::error::{MirrorError, MirrorResult};
use crate::core::release::{
    is_safe_path_segment, partial_path, write_manifest, AssetDescriptor, ReleaseDescriptor,
    MANIFEST_FILE_NAME, PARTIAL_SUFFIX,
};

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetOutcome {
    Downloaded,
    AlreadyPresent,
    Skipped,
}

/// Materializes releases under `<root>/<launcher>/<version>/`.
///
/// Assets are streamed to `<name>.partial` and renamed into place only once
/// complete. A file whose size already matches the advertised size is left
/// untouched, which is what lets an interrupted release resume on the next scan.
pub struct Downloader {
    client: Client,
    rules: RewriteRules,
    /// Attempts per asset, including the first.
    attempts: u32,
    retry_backoff: Duration,
}

impl Downloader {
    pub fn new(client: Client, rules: RewriteRules) -> Self {
        Self {
            client,
            rules,
            attempts: DEFAULT_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_backoff = backoff;
        self
    }

    // ── Release ─────────────────────────────────────────

    /// Write the manifest and every missing asset of `release`.
    ///
    /// Returns the manifest path. The first asset that exhausts its retries
    /// aborts the release; assets finished before it stay on disk.
    pub async fn materialize(
        &self,
        release: &ReleaseDescriptor,
        destination_root: &Path,
    ) -> MirrorResult<PathBuf> {
        let version = release
            .version()
            .ok_or_else(|| MirrorError::InvalidVersion(String::new()))?;
        if !is_safe_path_segment(&version) {
            return Err(MirrorError::InvalidVersion(version));
        }
        if !is_safe_path_segment(&release.launcher_name) {
            return Err(MirrorError::Config(format!(
                "launcher name {:?} is not a valid directory name",
                release.launcher_name
            )));
        }

        let dir = destination_root.join(&release.launcher_name).join(&version);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MirrorError::io(&dir, e))?;

        // Always rewritten: this is how the index learns about the version.
        let manifest_path = write_manifest(&dir, release).await?;
        info!(
            launcher = %release.launcher_name,
            "Wrote version info for {} to {:?}",
            version, manifest_path
        );

        let (mut downloaded, mut present, mut skipped) = (0, 0, 0);
        for asset in &release.assets {
            match self.sync_asset(&dir, asset).await {
                Ok(AssetOutcome::Downloaded) => downloaded += 1,
                Ok(AssetOutcome::AlreadyPresent) => present += 1,
                Ok(AssetOutcome::Skipped) => skipped += 1,
                Err(e) => {
                    warn!(
                        launcher = %release.launcher_name,
                        "Download of {} failed: {}", asset.name, e
                    );
                    return Err(e);
                }
            }
        }

        info!(
            launcher = %release.launcher_name,
            "Release {} synced: {} downloaded, {} already present, {} skipped",
            version, downloaded, present, skipped
        );
        Ok(manifest_path)
    }

    // ── Single asset ────────────────────────────────────

    async fn sync_asset(&self, dir: &Path, asset: &AssetDescriptor) -> MirrorResult<AssetOutcome> {
        let Some(file_name) = asset_file_name(asset) else {
            warn!("Asset without a usable file name ({:?}), skipping", asset.download_url);
            return Ok(AssetOutcome::Skipped);
        };
        if is_reserved_name(&file_name) {
            warn!("Asset {} would clobber mirror bookkeeping files, skipping", file_name);
            return Ok(AssetOutcome::Skipped);
        }
        let dest = dir.join(&file_name);

        if let Ok(meta) = tokio::fs::metadata(&dest).await {
            if meta.is_file() && meta.len() == asset.size_bytes {
                debug!("{} already present with matching size, skipping", file_name);
                return Ok(AssetOutcome::AlreadyPresent);
            }
            info!(
                "{} exists but size differs (local {}, remote {}), downloading again",
                file_name,
                meta.len(),
                asset.size_bytes
            );
        }

        // Assets without a public URL need authenticated API access we don't do.
        let Some(url) = self.rules.apply(&asset.download_url) else {
            info!("{} has no download url, skipping", file_name);
            return Ok(AssetOutcome::Skipped);
        };

        self.download_with_retry(&url, &dest, &file_name, asset.size_bytes)
            .await?;
        Ok(AssetOutcome::Downloaded)
    }

    async fn download_with_retry(
        &self,
        url: &str,
        dest: &Path,
        file_name: &str,
        expected_size: u64,
    ) -> MirrorResult<()> {
        let mut last_error: Option<MirrorError> = None;

        for attempt in 1..=self.attempts {
            info!("Downloading {} to {:?} (attempt {})", url, dest, attempt);
            match self.download_once(url, dest, file_name, expected_size).await {
                Ok(written) => {
                    if written != expected_size {
                        warn!(
                            "{} finished with {} bytes, release advertised {}",
                            file_name, written, expected_size
                        );
                    }
                    info!("Finished {:?}", dest);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Download of {} failed: {}", url, e);
                    last_error = Some(e);
                    if attempt < self.attempts {
                        debug!("Retrying {} in {:?}", url, self.retry_backoff);
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
            }
        }

        Err(MirrorError::DownloadExhausted {
            url: url.to_string(),
            attempts: self.attempts,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".into()),
        })
    }

    /// One GET streamed into `<dest>.partial`, renamed over `dest` on success.
    /// Returns the number of bytes written.
    async fn download_once(
        &self,
        url: &str,
        dest: &Path,
        file_name: &str,
        expected_size: u64,
    ) -> MirrorResult<u64> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let partial = PartialFile::new(partial_path(dest));
        let mut file = tokio::fs::File::create(partial.path())
            .await
            .map_err(|e| MirrorError::io(partial.path(), e))?;

        let total = response
            .content_length()
            .or((expected_size > 0).then_some(expected_size));
        let mut progress = ProgressReporter::new(file_name, total);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| MirrorError::io(partial.path(), e))?;
            progress.advance(chunk.len() as u64);
        }

        file.flush()
            .await
            .map_err(|e| MirrorError::io(partial.path(), e))?;
        file.sync_all()
            .await
            .map_err(|e| MirrorError::io(partial.path(), e))?;
        // Closed before the rename.
        drop(file);
        progress.finish();

        partial.persist(dest).await?;
        Ok(progress.written())
    }
}

/// On-disk name for an asset: its declared name, else the last URL segment,
/// reduced to a single path component.
fn asset_file_name(asset: &AssetDescriptor) -> Option<String> {
    let raw = if asset.name.trim().is_empty() {
        asset
            .download_url
            .split(['?', '#'])
            .next()
            .and_then(|u| u.rsplit('/').next())
            .unwrap_or_default()
    } else {
        asset.name.trim()
    };

    let name = Path::new(raw).file_name()?.to_str()?.to_string();
    is_safe_path_segment(&name).then_some(name)
}

/// Names the mirror itself writes into a version directory.
fn is_reserved_name(file_name: &str) -> bool {
    file_name.eq_ignore_ascii_case(MANIFEST_FILE_NAME) || file_name.ends_with(PARTIAL_SUFFIX)
}

/// A `.partial` file that is deleted when dropped unless persisted.
///
/// Covers both error returns and a cancelled future (deadline expiry),
/// so a half-written transfer never survives under any name.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(mut self, dest: &Path) -> MirrorResult<()> {
        tokio::fs::rename(&self.path, dest)
            .await
            .map_err(|e| MirrorError::io(dest, e))?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, url: &str) -> AssetDescriptor {
        AssetDescriptor {
            name: name.into(),
            download_url: url.into(),
            size_bytes: 0,
        }
    }

    #[test]
    fn file_name_prefers_declared_name() {
        assert_eq!(
            asset_file_name(&asset("app.zip", "https://x/y/other.zip")).as_deref(),
            Some("app.zip")
        );
    }

    #[test]
    fn file_name_falls_back_to_url_segment() {
        assert_eq!(
            asset_file_name(&asset("", "https://x/dl/tool-1.0.tar.gz?raw=1")).as_deref(),
            Some("tool-1.0.tar.gz")
        );
    }

    #[test]
    fn file_name_cannot_escape_version_dir() {
        assert_eq!(
            asset_file_name(&asset("../../etc/passwd", "")).as_deref(),
            Some("passwd")
        );
        assert_eq!(asset_file_name(&asset("", "")), None);
        assert_eq!(asset_file_name(&asset("..", "")), None);
    }

    #[test]
    fn dropping_an_armed_partial_file_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin.partial");
        std::fs::write(&path, b"half").unwrap();

        drop(PartialFile::new(path.clone()));

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn persisting_renames_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.bin");
        let partial = PartialFile::new(partial_path(&dest));
        std::fs::write(partial.path(), b"done").unwrap();

        partial.persist(&dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"done");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn unsafe_versions_are_rejected_before_touching_disk() {
        let root = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(Client::new(), RewriteRules::default());
        let release = ReleaseDescriptor {
            launcher_name: "demo".into(),
            tag: "../escape".into(),
            display_name: String::new(),
            published_at: None,
            assets: vec![],
            release_id: None,
        };

        let err = downloader.materialize(&release, root.path()).await.unwrap_err();

        assert!(matches!(err, MirrorError::InvalidVersion(_)));
        assert!(std::fs::read_dir(root.path()).unwrap().next().is_none());
    }

    #[test]
    fn bookkeeping_names_are_reserved() {
        assert!(is_reserved_name("index.json"));
        assert!(is_reserved_name("INDEX.JSON"));
        assert!(is_reserved_name("app.zip.partial"));
        assert!(!is_reserved_name("index.json.zip"));
    }

    #[tokio::test]
    async fn assets_named_like_the_manifest_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(Client::new(), RewriteRules::default())
            .with_retry(1, Duration::from_millis(1));
        let release = ReleaseDescriptor {
            launcher_name: "demo".into(),
            tag: "1.0.0".into(),
            display_name: String::new(),
            published_at: None,
            assets: vec![
                AssetDescriptor {
                    name: "index.json".into(),
                    download_url: "http://127.0.0.1:9/index.json".into(),
                    size_bytes: 7,
                },
                AssetDescriptor {
                    name: "app.zip.partial".into(),
                    download_url: "http://127.0.0.1:9/app.zip.partial".into(),
                    size_bytes: 7,
                },
            ],
            release_id: None,
        };

        let manifest = downloader.materialize(&release, root.path()).await.unwrap();

        let read = crate::core::release::read_manifest(&manifest).await.unwrap();
        assert_eq!(read, release);
        assert!(!manifest.with_file_name("app.zip.partial").exists());
    }
}
