// ─── Release Manifest ───
// Reads and writes the `index.json` stored in every version directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::model::ReleaseDescriptor;
use crate::core::error::{MirrorError, MirrorResult};

pub const MANIFEST_FILE_NAME: &str = "index.json";

/// Suffix of in-flight files. Nothing with this suffix is ever a finished artifact.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// `<path>.partial`, the sibling a file is written to before being renamed into place.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Serialize `release` into `<dir>/index.json` and return that path.
///
/// The file is written next to its final location first and renamed once
/// complete, so status readers never see a truncated manifest.
pub async fn write_manifest(dir: &Path, release: &ReleaseDescriptor) -> MirrorResult<PathBuf> {
    let path = dir.join(MANIFEST_FILE_NAME);
    let tmp = partial_path(&path);
    let json = serde_json::to_string_pretty(release)?;

    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| MirrorError::io(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, &path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(MirrorError::io(&path, e));
    }

    debug!("Wrote release manifest {:?}", path);
    Ok(path)
}

pub async fn read_manifest(path: &Path) -> MirrorResult<ReleaseDescriptor> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MirrorError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::release::AssetDescriptor;

    #[test]
    fn partial_path_appends_suffix() {
        let p = partial_path(Path::new("/data/demo/1.0/app.tar.gz"));
        assert_eq!(p, PathBuf::from("/data/demo/1.0/app.tar.gz.partial"));
    }

    #[tokio::test]
    async fn manifest_survives_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let release = ReleaseDescriptor {
            launcher_name: "demo".into(),
            tag: "v2.1".into(),
            display_name: "Two One".into(),
            published_at: Some("2024-03-01T10:00:00Z".parse().unwrap()),
            assets: vec![AssetDescriptor {
                name: "demo.exe".into(),
                download_url: "https://github.com/acme/demo/releases/download/v2.1/demo.exe".into(),
                size_bytes: 1024,
            }],
            release_id: Some(5),
        };

        let path = write_manifest(dir.path(), &release).await.unwrap();
        assert_eq!(path, dir.path().join(MANIFEST_FILE_NAME));
        assert!(!partial_path(&path).exists());

        let read = read_manifest(&path).await.unwrap();
        assert_eq!(read.tag, "v2.1");
        assert_eq!(read.assets, release.assets);
        assert_eq!(read.release_id, None);
    }

    #[tokio::test]
    async fn corrupt_manifest_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(read_manifest(&path).await, Err(MirrorError::Json(_))));
    }
}
