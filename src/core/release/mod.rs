pub mod manifest;
pub mod model;

pub use manifest::{
    partial_path, read_manifest, write_manifest, MANIFEST_FILE_NAME, PARTIAL_SUFFIX,
};
pub use model::{is_safe_path_segment, AssetDescriptor, MirrorRecord, ReleaseDescriptor};
