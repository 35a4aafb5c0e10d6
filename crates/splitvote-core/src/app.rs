//! App state type

use std::sync::Arc;

use crate::events::EventBus;
use crate::rate_limit::{RateLimitManager, RateLimitSettings};
use crate::token::TokenService;

use splitvote_types::vote_adapter::VoteAdapter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug)]
pub struct AppBuilderOpts {
	pub listen: Box<str>,
	/// External base URL used when constructing invite links
	pub base_url: Box<str>,
	/// Secret for signed access tokens
	pub token_secret: Box<str>,
	pub rate_limits: RateLimitSettings,
}

pub struct AppState {
	pub opts: AppBuilderOpts,
	pub vote_adapter: Arc<dyn VoteAdapter>,
	pub rate_limiter: Arc<RateLimitManager>,
	pub tokens: TokenService,
	pub events: EventBus,
}

pub type App = Arc<AppState>;

impl AppState {
	pub fn build(opts: AppBuilderOpts, vote_adapter: Arc<dyn VoteAdapter>) -> App {
		let rate_limiter = Arc::new(RateLimitManager::new(opts.rate_limits.purge_interval));
		let tokens = TokenService::new(opts.token_secret.clone());

		Arc::new(Self {
			opts,
			vote_adapter,
			rate_limiter,
			tokens,
			events: EventBus::default(),
		})
	}
}

// vim: ts=4
