pub mod client;
pub mod rate_limit;

pub use client::{ReleaseFetcher, DEFAULT_API_BASE};
pub use rate_limit::{RateLimitInfo, MAX_RATE_LIMIT_WAIT};
