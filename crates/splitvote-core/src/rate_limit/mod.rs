//! Fixed-window rate limiting for mutation endpoints.
//!
//! The limiter is an injected, explicitly-owned store held by [`crate::AppState`];
//! it is process-local and ephemeral (a restart resets all windows), which is
//! acceptable for abuse mitigation on a single instance but is not a
//! substitute for a distributed limiter under horizontal scaling.

pub mod config;
pub mod error;
pub mod limiter;

pub use config::{RateLimitConfig, RateLimitSettings};
pub use error::RateLimitError;
pub use limiter::{RateLimitManager, RateLimitStatus, RateLimiterStats};

// vim: ts=4
