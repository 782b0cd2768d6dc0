use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use crate::core::release::{read_manifest, MirrorRecord, ReleaseDescriptor};
use crate::core::state::AppState;
use crate::core::version::{compare_versions, VersionIndex};

pub const LATEST_VERSION_HEADER: &str = "x-latest-version";
pub const LATEST_VERSIONS_HEADER: &str = "x-latest-versions";

/// One mirrored version as reported by the status API.
#[derive(Debug, Serialize)]
pub struct VersionStatus {
    pub version: String,
    pub manifest_path: PathBuf,
    /// `None` when the manifest could not be read back.
    pub release: Option<ReleaseDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiError {
    fn not_found(message: String) -> Self {
        Self {
            error: "not_found".to_string(),
            message,
            status: StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/status/:launcher", get(get_launcher_status))
        .route("/api/latest", get(get_latest))
        .route("/api/latest/:launcher", get(get_launcher_latest))
        .route("/api/scan", post(trigger_scan))
        .with_state(state)
}

// ── Status ──────────────────────────────────────────────

/// Every indexed version of every launcher, newest first.
pub async fn collect_status(index: &VersionIndex) -> BTreeMap<String, Vec<VersionStatus>> {
    let mut status = BTreeMap::new();
    for (launcher, records) in index.snapshot() {
        status.insert(launcher, describe_versions(records).await);
    }
    status
}

/// `None` when the launcher has nothing indexed.
pub async fn launcher_status(index: &VersionIndex, launcher: &str) -> Option<Vec<VersionStatus>> {
    let records = index.list(launcher)?;
    Some(describe_versions(records).await)
}

async fn describe_versions(mut records: Vec<MirrorRecord>) -> Vec<VersionStatus> {
    records.sort_by(|a, b| compare_versions(&b.version, &a.version));

    let mut described = Vec::with_capacity(records.len());
    for record in records {
        let release = match read_manifest(&record.manifest_path).await {
            Ok(release) => Some(release),
            Err(e) => {
                warn!(
                    launcher = %record.launcher,
                    "Unreadable manifest for {}: {}",
                    record.version,
                    e
                );
                None
            }
        };
        described.push(VersionStatus {
            version: record.version,
            manifest_path: record.manifest_path,
            release,
        });
    }
    described
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, Vec<VersionStatus>>> {
    Json(collect_status(&state.index).await)
}

async fn get_launcher_status(
    State(state): State<Arc<AppState>>,
    Path(launcher): Path<String>,
) -> Result<Json<Vec<VersionStatus>>, ApiError> {
    launcher_status(&state.index, &launcher)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Launcher {launcher} has no mirrored versions")))
}

// ── Latest ──────────────────────────────────────────────

async fn get_latest(State(state): State<Arc<AppState>>) -> Response {
    let latest = state.index.latest_all();
    let mut headers = HeaderMap::new();
    match serde_json::to_string(&latest).map(|json| HeaderValue::from_str(&json)) {
        Ok(Ok(value)) => {
            headers.insert(HeaderName::from_static(LATEST_VERSIONS_HEADER), value);
        }
        _ => warn!("Latest versions do not fit in a header, omitting it"),
    }
    (headers, Json(latest)).into_response()
}

async fn get_launcher_latest(
    State(state): State<Arc<AppState>>,
    Path(launcher): Path<String>,
) -> Result<Response, ApiError> {
    let version = state
        .index
        .latest(&launcher)
        .ok_or_else(|| ApiError::not_found(format!("No latest version for {launcher}")))?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&version) {
        headers.insert(HeaderName::from_static(LATEST_VERSION_HEADER), value);
    }
    Ok((headers, version).into_response())
}

// ── Scan ────────────────────────────────────────────────

async fn trigger_scan(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    info!("Manual scan requested");
    state.scanner.trigger();
    (StatusCode::ACCEPTED, "Scan triggered")
}
