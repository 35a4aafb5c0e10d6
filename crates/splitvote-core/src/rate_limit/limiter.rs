//! Rate Limit Manager
//!
//! Fixed-window counter keyed by `action:identifier`. An entry counts
//! attempts until its window resets; expired entries are purged lazily, at
//! most once per purge interval. Counter updates are atomic under the write
//! lock; at a window boundary marginally more than `max_attempts` calls can
//! slip through, which is an accepted approximation of this algorithm.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::config::RateLimitConfig;
use super::error::RateLimitError;

/// One counting window
#[derive(Clone, Copy, Debug)]
struct WindowEntry {
	count: u32,
	reset_at: Instant,
}

/// Successful check result, useful for progress headers and UIs
#[derive(Clone, Copy, Debug)]
pub struct RateLimitStatus {
	/// Attempts left in the current window
	pub remaining: u32,
	/// Time until the current window resets
	pub reset_in: Duration,
}

/// Statistics about the rate limiter
#[derive(Clone, Copy, Debug, Default)]
pub struct RateLimiterStats {
	/// Number of live `action:identifier` windows
	pub tracked_keys: usize,
	/// Total requests that were rate limited
	pub total_limited: u64,
}

/// Main rate limit manager
#[derive(Debug)]
pub struct RateLimitManager {
	entries: RwLock<HashMap<Box<str>, WindowEntry>>,
	last_purge: Mutex<Instant>,
	purge_interval: Duration,
	total_limited: AtomicU64,
}

impl RateLimitManager {
	pub fn new(purge_interval: Duration) -> Self {
		Self {
			entries: RwLock::new(HashMap::new()),
			last_purge: Mutex::new(Instant::now()),
			purge_interval,
			total_limited: AtomicU64::new(0),
		}
	}

	/// Count one attempt of `action` by `identifier` against `cfg`
	pub fn check(
		&self,
		action: &'static str,
		identifier: &str,
		cfg: &RateLimitConfig,
	) -> Result<RateLimitStatus, RateLimitError> {
		self.maybe_purge();

		let key = format!("{}:{}", action, identifier);
		let now = Instant::now();
		let mut entries = self.entries.write();

		match entries.get_mut(key.as_str()) {
			Some(entry) if now <= entry.reset_at => {
				if entry.count < cfg.max_attempts {
					entry.count += 1;
					Ok(RateLimitStatus {
						remaining: cfg.max_attempts.saturating_sub(entry.count),
						reset_in: entry.reset_at - now,
					})
				} else {
					let retry_after = entry.reset_at - now;
					self.total_limited.fetch_add(1, Ordering::Relaxed);
					debug!(action, identifier, ?retry_after, "rate limited");
					Err(RateLimitError::RateLimited { action, retry_after })
				}
			}
			_ => {
				// No entry, or the previous window has expired
				entries.insert(
					key.into_boxed_str(),
					WindowEntry { count: 1, reset_at: now + cfg.window() },
				);
				Ok(RateLimitStatus {
					remaining: cfg.max_attempts.saturating_sub(1),
					reset_in: cfg.window(),
				})
			}
		}
	}

	pub fn stats(&self) -> RateLimiterStats {
		RateLimiterStats {
			tracked_keys: self.entries.read().len(),
			total_limited: self.total_limited.load(Ordering::Relaxed),
		}
	}

	/// Drop expired windows, at most once per purge interval
	fn maybe_purge(&self) {
		let now = Instant::now();
		{
			let mut last_purge = self.last_purge.lock();
			if now.duration_since(*last_purge) < self.purge_interval {
				return;
			}
			*last_purge = now;
		}

		let mut entries = self.entries.write();
		let before = entries.len();
		entries.retain(|_, entry| now <= entry.reset_at);
		debug!("purged {} expired rate limit entries", before - entries.len());
	}
}

impl Default for RateLimitManager {
	fn default() -> Self {
		Self::new(Duration::from_secs(60))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cfg(window_ms: u64, max_attempts: u32) -> RateLimitConfig {
		RateLimitConfig::new(window_ms, max_attempts)
	}

	#[test]
	fn test_counts_down_then_limits() {
		let manager = RateLimitManager::default();
		let cfg = cfg(60_000, 5);

		for expected_remaining in (0..5).rev() {
			let status = manager.check("login", "10.0.0.1", &cfg).unwrap();
			assert_eq!(status.remaining, expected_remaining);
		}

		let err = manager.check("login", "10.0.0.1", &cfg);
		match err {
			Err(RateLimitError::RateLimited { retry_after, .. }) => {
				assert!(retry_after > Duration::ZERO);
			}
			other => panic!("expected RateLimited, got {:?}", other),
		}
	}

	#[test]
	fn test_window_expiry_resets_the_count() {
		let manager = RateLimitManager::default();
		let cfg = cfg(50, 2);

		manager.check("submit", "a", &cfg).unwrap();
		manager.check("submit", "a", &cfg).unwrap();
		assert!(manager.check("submit", "a", &cfg).is_err());

		std::thread::sleep(Duration::from_millis(80));

		let status = manager.check("submit", "a", &cfg).unwrap();
		assert_eq!(status.remaining, cfg.max_attempts - 1);
	}

	#[test]
	fn test_keys_are_independent() {
		let manager = RateLimitManager::default();
		let cfg = cfg(60_000, 1);

		manager.check("submit", "a", &cfg).unwrap();
		assert!(manager.check("submit", "a", &cfg).is_err());

		// Different identifier, same action
		manager.check("submit", "b", &cfg).unwrap();
		// Different action, same identifier
		manager.check("close", "a", &cfg).unwrap();
	}

	#[test]
	fn test_purge_drops_expired_entries() {
		let manager = RateLimitManager::new(Duration::from_millis(10));
		let cfg = cfg(20, 5);

		manager.check("submit", "a", &cfg).unwrap();
		manager.check("submit", "b", &cfg).unwrap();
		assert_eq!(manager.stats().tracked_keys, 2);

		std::thread::sleep(Duration::from_millis(40));

		// The next check triggers the purge and creates one fresh window
		manager.check("submit", "c", &cfg).unwrap();
		assert_eq!(manager.stats().tracked_keys, 1);
	}

	#[test]
	fn test_stats_count_limited_requests() {
		let manager = RateLimitManager::default();
		let cfg = cfg(60_000, 1);

		manager.check("submit", "a", &cfg).unwrap();
		let _ = manager.check("submit", "a", &cfg);
		let _ = manager.check("submit", "a", &cfg);

		assert_eq!(manager.stats().total_limited, 2);
	}
}

// vim: ts=4
