pub mod compare;
pub mod index;

pub use compare::{compare_versions, is_prerelease, pick_latest};
pub use index::VersionIndex;
