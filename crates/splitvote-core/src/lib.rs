//! Core infrastructure for the Splitvote engine.
//!
//! This crate contains shared infrastructure used by the feature crates and
//! the server binary: the application state, the fixed-window rate limiter
//! guarding mutation endpoints, the token service, the domain event bus, and
//! the recurrence calculator.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod events;
pub mod prelude;
pub mod rate_limit;
pub mod schedule;
pub mod token;

pub use app::{App, AppBuilderOpts, AppState};
pub use events::{EventBus, VoteEvent};
pub use rate_limit::RateLimitManager;
pub use token::TokenService;

// vim: ts=4
