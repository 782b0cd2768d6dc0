pub mod orchestrator;
pub mod pipeline;
pub mod schedule;

pub use orchestrator::{LauncherOutcome, ScanOutcome, ScanReport, Scanner};
pub use pipeline::{LauncherPipeline, MirrorPipeline};
pub use schedule::spawn_schedule;
