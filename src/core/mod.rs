// ─── Launcher Mirror Core ───
// Keeps local copies of the latest upstream release of every tracked launcher.
//
// Architecture:
//   core/
//     resolver/   - Source page -> upstream owner/repo (default, regex, CSS rules)
//     github/     - Latest-release fetcher + rate-limit accounting
//     downloader/ - Manifest + streamed asset downloads with retry and resume
//     release/    - Release/asset model + on-disk manifest
//     version/    - Version comparison + in-memory version index
//     scan/       - Per-launcher pipeline, single-flight scan, interval schedule
//     config.rs   - JSON config + validation
//     http.rs     - Shared HTTP client builders
//     state/      - Application state shared by the scheduler and the API

pub mod config;
pub mod downloader;
pub mod error;
pub mod github;
pub mod http;
pub mod release;
pub mod resolver;
pub mod scan;
pub mod state;
pub mod version;
