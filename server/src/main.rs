//! Splitvote server binary
//!
//! Wires the SQLite vote adapter, the rate limiter and the HTTP surface
//! together from environment-driven options, and runs a log-only subscriber
//! on the event bus where an external notifier would attach.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use splitvote_core::app::{AppBuilderOpts, AppState, VERSION};
use splitvote_core::events::VoteEvent;
use splitvote_core::rate_limit::RateLimitSettings;
use splitvote_vote_adapter_sqlite::VoteAdapterSqlite;

mod routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
		.init();

	let listen = std::env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".into());
	let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}", listen));
	let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into());
	let token_secret = match std::env::var("TOKEN_SECRET") {
		Ok(secret) => secret,
		Err(_) => {
			warn!("TOKEN_SECRET not set, access tokens will not survive a restart");
			splitvote_types::utils::random_token()?
		}
	};

	tokio::fs::create_dir_all(&data_dir).await?;
	let adapter = VoteAdapterSqlite::new(Path::new(&data_dir).join("vote.db")).await?;

	let app = AppState::build(
		AppBuilderOpts {
			listen: listen.clone().into(),
			base_url: base_url.into(),
			token_secret: token_secret.into(),
			rate_limits: RateLimitSettings::default(),
		},
		Arc::new(adapter),
	);

	// Log-only notifier; an email/push notifier would subscribe the same way
	let mut events = app.events.subscribe();
	tokio::spawn(async move {
		while let Ok(event) = events.recv().await {
			match event {
				VoteEvent::BallotSubmitted { sn_id, submitted, total, .. } => {
					info!(%sn_id, submitted, total, "Ballot submitted");
				}
				VoteEvent::SessionClosed { sn_id, auto } => {
					info!(%sn_id, auto, "Session closed");
				}
			}
		}
	});

	let router = routes::build(app);
	let listener = tokio::net::TcpListener::bind(&listen).await?;
	info!("Splitvote {} listening on {}", VERSION, listen);

	axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await?;

	Ok(())
}

// vim: ts=4
