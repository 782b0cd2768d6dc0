use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One remote file belonging to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub name: String,
    /// Original upstream URL, before any proxy or mirror rewriting.
    #[serde(rename = "url")]
    pub download_url: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
}

/// The latest release of a launcher as seen at fetch time.
///
/// Serialized as-is into the manifest (`index.json`) next to the assets:
/// `{launcher, tag_name, name, published_at, assets: [{name, url, size}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    #[serde(rename = "launcher")]
    pub launcher_name: String,
    #[serde(rename = "tag_name", default)]
    pub tag: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assets: Vec<AssetDescriptor>,
    /// Upstream numeric id, only used as a last-resort version key.
    #[serde(skip)]
    pub release_id: Option<u64>,
}

impl ReleaseDescriptor {
    /// Version key for this release: the tag, else the display name,
    /// else the upstream release id.
    pub fn version(&self) -> Option<String> {
        if !self.tag.is_empty() {
            return Some(self.tag.clone());
        }
        if !self.display_name.is_empty() {
            return Some(self.display_name.clone());
        }
        self.release_id.map(|id| id.to_string())
    }
}

/// Manifests written by older mirrors store an empty asset list as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Whether `segment` can be used as exactly one directory name under the
/// storage root: non-empty, not `.`/`..`, no path separators.
pub fn is_safe_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
        && !segment.contains('\0')
}

/// A release materialized on disk. `manifest_path` points at its `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub launcher: String,
    pub version: String,
    pub manifest_path: std::path::PathBuf,
}
