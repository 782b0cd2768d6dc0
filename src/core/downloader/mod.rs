pub mod client;
pub mod progress;
pub mod rewrite;

pub use client::{Downloader, DEFAULT_ATTEMPTS, DEFAULT_RETRY_BACKOFF};
pub use progress::ProgressReporter;
pub use rewrite::RewriteRules;
