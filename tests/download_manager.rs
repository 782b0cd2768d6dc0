//! Integration test: materializing releases against a local HTTP server.

mod common;

use std::time::Duration;

use common::http_server::{self, Route};
use launcher_mirror_lib::core::downloader::{Downloader, RewriteRules};
use launcher_mirror_lib::core::error::MirrorError;
use launcher_mirror_lib::core::http::build_download_client;
use launcher_mirror_lib::core::release::{read_manifest, AssetDescriptor, ReleaseDescriptor};
use tempfile::tempdir;

fn downloader() -> Downloader {
    Downloader::new(build_download_client(None).unwrap(), RewriteRules::default())
        .with_retry(3, Duration::from_millis(10))
}

fn release(tag: &str, assets: Vec<AssetDescriptor>) -> ReleaseDescriptor {
    ReleaseDescriptor {
        launcher_name: "alpha".into(),
        tag: tag.into(),
        display_name: String::new(),
        published_at: None,
        assets,
        release_id: None,
    }
}

fn asset(name: &str, url: String, size: usize) -> AssetDescriptor {
    AssetDescriptor {
        name: name.into(),
        download_url: url,
        size_bytes: size as u64,
    }
}

#[tokio::test]
async fn fresh_release_is_downloaded_next_to_its_manifest() {
    let body: Vec<u8> = (0u8..=255).cycle().take(48 * 1024).collect();
    let server = http_server::start(vec![("/alpha.zip", Route::ok(body.clone()))]);
    let root = tempdir().unwrap();

    let rel = release(
        "v1.0.0",
        vec![asset("alpha.zip", server.url("/alpha.zip"), body.len())],
    );
    let manifest = downloader().materialize(&rel, root.path()).await.unwrap();

    let dir = root.path().join("alpha").join("v1.0.0");
    assert_eq!(manifest, dir.join("index.json"));
    assert_eq!(read_manifest(&manifest).await.unwrap(), rel);
    assert_eq!(std::fs::read(dir.join("alpha.zip")).unwrap(), body);
    assert!(!dir.join("alpha.zip.partial").exists());
}

#[tokio::test]
async fn complete_assets_are_not_requested_again() {
    let body = b"already here".to_vec();
    let server = http_server::start(vec![("/alpha.zip", Route::ok(body.clone()))]);
    let root = tempdir().unwrap();
    let rel = release(
        "v1.0.0",
        vec![asset("alpha.zip", server.url("/alpha.zip"), body.len())],
    );

    downloader().materialize(&rel, root.path()).await.unwrap();
    assert_eq!(server.hits("/alpha.zip"), 1);

    downloader().materialize(&rel, root.path()).await.unwrap();
    assert_eq!(server.hits("/alpha.zip"), 1);
}

#[tokio::test]
async fn size_mismatch_triggers_a_fresh_download() {
    let body = b"new contents".to_vec();
    let server = http_server::start(vec![("/alpha.zip", Route::ok(body.clone()))]);
    let root = tempdir().unwrap();
    let dir = root.path().join("alpha").join("v2");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("alpha.zip"), b"stale").unwrap();

    let rel = release(
        "v2",
        vec![asset("alpha.zip", server.url("/alpha.zip"), body.len())],
    );
    downloader().materialize(&rel, root.path()).await.unwrap();

    assert_eq!(server.hits("/alpha.zip"), 1);
    assert_eq!(std::fs::read(dir.join("alpha.zip")).unwrap(), body);
}

#[tokio::test]
async fn interrupted_transfer_leaves_no_file_behind() {
    let body = vec![7u8; 32 * 1024];
    let server = http_server::start(vec![(
        "/alpha.zip",
        Route::ok(body.clone()).truncated(1024),
    )]);
    let root = tempdir().unwrap();
    let rel = release(
        "v1.0.0",
        vec![asset("alpha.zip", server.url("/alpha.zip"), body.len())],
    );

    let err = downloader().materialize(&rel, root.path()).await.unwrap_err();
    assert!(matches!(err, MirrorError::DownloadExhausted { attempts: 3, .. }), "{err}");

    let dir = root.path().join("alpha").join("v1.0.0");
    assert!(!dir.join("alpha.zip").exists());
    assert!(!dir.join("alpha.zip.partial").exists());
    assert_eq!(server.hits("/alpha.zip"), 3);
}

#[tokio::test]
async fn error_status_is_retried_then_aborts_the_release() {
    let server = http_server::start(vec![("/second.zip", Route::ok(b"never".to_vec()))]);
    let root = tempdir().unwrap();
    let rel = release(
        "v1.0.0",
        vec![
            asset("first.zip", server.url("/missing.zip"), 10),
            asset("second.zip", server.url("/second.zip"), 5),
        ],
    );

    let err = downloader().materialize(&rel, root.path()).await.unwrap_err();
    assert!(matches!(err, MirrorError::DownloadExhausted { .. }), "{err}");
    assert_eq!(server.hits("/missing.zip"), 3);
    // The first failing asset stops the release.
    assert_eq!(server.hits("/second.zip"), 0);
}

#[tokio::test]
async fn assets_without_url_are_skipped() {
    let server = http_server::start(vec![("/b.zip", Route::ok(b"bb".to_vec()))]);
    let root = tempdir().unwrap();
    let rel = release(
        "v1",
        vec![
            asset("a.zip", String::new(), 4),
            asset("b.zip", server.url("/b.zip"), 2),
        ],
    );

    downloader().materialize(&rel, root.path()).await.unwrap();

    let dir = root.path().join("alpha").join("v1");
    assert!(!dir.join("a.zip").exists());
    assert_eq!(std::fs::read(dir.join("b.zip")).unwrap(), b"bb");
    assert_eq!(server.total_hits(), 1);
}

#[tokio::test]
async fn display_name_is_the_version_when_tag_is_empty() {
    let root = tempdir().unwrap();
    let mut rel = release("", Vec::new());
    rel.display_name = "Build 42".into();

    let manifest = downloader().materialize(&rel, root.path()).await.unwrap();
    assert_eq!(manifest, root.path().join("alpha").join("Build 42").join("index.json"));
}

#[tokio::test]
async fn path_like_versions_are_rejected() {
    let root = tempdir().unwrap();
    let rel = release("../escape", Vec::new());

    let err = downloader().materialize(&rel, root.path()).await.unwrap_err();
    assert!(matches!(err, MirrorError::InvalidVersion(v) if v == "../escape"));
    assert!(std::fs::read_dir(root.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn asset_proxy_prefix_is_applied() {
    let server = http_server::start(vec![("/proxy/https://github.com/acme/alpha/a.zip", Route::ok(b"via proxy".to_vec()))]);
    let root = tempdir().unwrap();
    let rules = RewriteRules {
        asset_proxy: Some(server.url("/proxy/")),
        mirror_domain: None,
        mirror_enabled: false,
    };
    let rel = release(
        "v1",
        vec![asset("a.zip", "https://github.com/acme/alpha/a.zip".into(), 9)],
    );

    Downloader::new(build_download_client(None).unwrap(), rules)
        .with_retry(1, Duration::from_millis(10))
        .materialize(&rel, root.path())
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(root.path().join("alpha").join("v1").join("a.zip")).unwrap(),
        b"via proxy"
    );
}
