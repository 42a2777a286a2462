//! wanderlust-guard: content policy, input/output filtering and rate limiting

pub mod filter;
pub mod policy;
pub mod rate_limit;

pub use filter::{InputCheck, OutputCheck, RejectReason, SafetyFilter};
pub use policy::{ContentPolicy, DEFAULT_REDIRECT};
pub use rate_limit::{RateDecision, RateLimitConfig, RateLimiter};
