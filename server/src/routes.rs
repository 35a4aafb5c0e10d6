//! Route assembly

use axum::{
	Router,
	routing::{get, post},
};
use tower_http::trace::TraceLayer;

use splitvote_core::app::App;
use splitvote_session::handler;

pub fn build(app: App) -> Router {
	Router::new()
		.route("/api/session", post(handler::post_session))
		.route("/api/session/{sn_id}", get(handler::get_session))
		.route("/api/session/{sn_id}/close", post(handler::post_close))
		.route("/api/session/{sn_id}/results", get(handler::get_results))
		.route("/api/session/{sn_id}/payout", post(handler::post_payout))
		.route("/api/vote/{invite_token}", get(handler::get_vote).put(handler::put_vote))
		.route("/api/schedule/next-run", get(handler::get_next_run))
		.layer(TraceLayer::new_for_http())
		.with_state(app)
}

// vim: ts=4
