//! Rate limiting configuration
//!
//! Per-action fixed-window configuration with documented defaults.

use std::time::Duration;

/// Fixed-window limit for a single action
#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
	/// Window length in milliseconds
	pub window_ms: u64,
	/// Attempts allowed within one window
	pub max_attempts: u32,
}

impl RateLimitConfig {
	pub fn new(window_ms: u64, max_attempts: u32) -> Self {
		Self { window_ms, max_attempts }
	}

	pub fn window(&self) -> Duration {
		Duration::from_millis(self.window_ms)
	}
}

/// Per-action limits plus housekeeping knobs
#[derive(Clone, Debug)]
pub struct RateLimitSettings {
	/// Session creation (token minting, roster writes)
	pub session_create: RateLimitConfig,
	/// Ballot submission (the hottest mutation endpoint)
	pub ballot_submit: RateLimitConfig,
	/// Explicit session close
	pub session_close: RateLimitConfig,
	/// Minimum time between purges of expired window entries
	pub purge_interval: Duration,
}

impl Default for RateLimitSettings {
	fn default() -> Self {
		Self {
			// Creation mints tokens and writes a whole roster: keep it tight
			session_create: RateLimitConfig::new(60_000, 10),
			// Resubmission is legitimate, allow a comfortable margin
			ballot_submit: RateLimitConfig::new(60_000, 30),
			session_close: RateLimitConfig::new(60_000, 10),
			purge_interval: Duration::from_secs(60),
		}
	}
}

// vim: ts=4
