use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::compare::pick_latest;
use crate::core::error::{MirrorError, MirrorResult};
use crate::core::release::{MirrorRecord, MANIFEST_FILE_NAME};

/// In-memory registry of mirrored releases: `launcher -> version -> record`,
/// plus the latest version of each launcher.
///
/// The latest entry is recomputed under the same write lock as every insert
/// or remove, so it always reflects the record set it was derived from.
#[derive(Debug, Default)]
pub struct VersionIndex {
    inner: RwLock<IndexState>,
}

#[derive(Debug, Default)]
struct IndexState {
    /// Versions keep insertion order; `pick_latest` folds over them in that order.
    records: HashMap<String, IndexMap<String, MirrorRecord>>,
    latest: HashMap<String, String>,
}

impl IndexState {
    fn recompute_latest(&mut self, launcher: &str) {
        let latest = self
            .records
            .get(launcher)
            .and_then(|versions| pick_latest(versions.keys().map(String::as_str)))
            .map(str::to_owned);

        match latest {
            Some(version) => {
                self.latest.insert(launcher.to_string(), version);
            }
            None => {
                self.latest.remove(launcher);
            }
        }
    }
}

impl VersionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a record, then recompute the launcher's latest version.
    pub fn insert(&self, launcher: &str, version: &str, manifest_path: impl Into<PathBuf>) {
        let record = MirrorRecord {
            launcher: launcher.to_string(),
            version: version.to_string(),
            manifest_path: manifest_path.into(),
        };

        let mut state = self.inner.write();
        state
            .records
            .entry(launcher.to_string())
            .or_default()
            .insert(version.to_string(), record);
        state.recompute_latest(launcher);
    }

    /// Drop a record if present. Returns whether anything was removed.
    pub fn remove(&self, launcher: &str, version: &str) -> bool {
        let mut state = self.inner.write();
        let Some(versions) = state.records.get_mut(launcher) else {
            return false;
        };
        let removed = versions.shift_remove(version).is_some();
        if versions.is_empty() {
            state.records.remove(launcher);
        }
        state.recompute_latest(launcher);
        removed
    }

    pub fn latest(&self, launcher: &str) -> Option<String> {
        self.inner.read().latest.get(launcher).cloned()
    }

    pub fn latest_all(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .latest
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn get(&self, launcher: &str, version: &str) -> Option<MirrorRecord> {
        self.inner
            .read()
            .records
            .get(launcher)
            .and_then(|versions| versions.get(version))
            .cloned()
    }

    /// Records for one launcher in insertion order; `None` if the launcher is unknown.
    pub fn list(&self, launcher: &str) -> Option<Vec<MirrorRecord>> {
        self.inner
            .read()
            .records
            .get(launcher)
            .map(|versions| versions.values().cloned().collect())
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<MirrorRecord>> {
        self.inner
            .read()
            .records
            .iter()
            .map(|(launcher, versions)| (launcher.clone(), versions.values().cloned().collect()))
            .collect()
    }

    /// Repopulate the index from `root/<launcher>/<version>/index.json`.
    ///
    /// Only directories exactly two levels below `root` count. A missing
    /// root is an empty mirror. Returns the number of records registered.
    pub fn bootstrap(&self, root: &Path) -> MirrorResult<usize> {
        if !root.exists() {
            debug!("Storage root {:?} does not exist yet, nothing to bootstrap", root);
            return Ok(0);
        }

        let mut count = 0;
        for launcher_dir in read_subdirs(root)? {
            let Some(launcher) = dir_name(&launcher_dir) else {
                continue;
            };
            let version_dirs = match read_subdirs(&launcher_dir) {
                Ok(dirs) => dirs,
                Err(e) => {
                    warn!("Skipping {:?}: {}", launcher_dir, e);
                    continue;
                }
            };
            for version_dir in version_dirs {
                let manifest = version_dir.join(MANIFEST_FILE_NAME);
                let Some(version) = dir_name(&version_dir) else {
                    continue;
                };
                if manifest.is_file() {
                    self.insert(&launcher, &version, manifest);
                    count += 1;
                }
            }
        }

        info!("Bootstrapped {} mirrored versions from {:?}", count, root);
        Ok(count)
    }
}

fn read_subdirs(dir: &Path) -> MirrorResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| MirrorError::io(dir, e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MirrorError::io(dir, e))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
}
