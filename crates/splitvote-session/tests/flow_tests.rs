//! End-to-end service flows over the SQLite adapter
//!
//! Exercises the submission protocol invariants: the 100%-sum check,
//! replace-not-merge resubmission, idempotent auto-close, closed-session
//! immutability, anonymity gating and payout proportionality.

use std::sync::Arc;

use splitvote_core::app::{App, AppBuilderOpts, AppState};
use splitvote_core::events::VoteEvent;
use splitvote_core::rate_limit::RateLimitSettings;
use splitvote_session::payout;
use splitvote_session::service::{
	self, CreateSessionParams, CreatedSessionTokens, NewParticipant,
};
use splitvote_types::error::Error;
use splitvote_types::vote_adapter::{SessionStatus, Vote, VoteAdapter};
use splitvote_vote_adapter_sqlite::VoteAdapterSqlite;
use tempfile::TempDir;

async fn test_app() -> (App, TempDir) {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let adapter = VoteAdapterSqlite::new(temp_dir.path().join("vote.db"))
		.await
		.expect("Failed to create adapter");

	let app = AppState::build(
		AppBuilderOpts {
			listen: "127.0.0.1:0".into(),
			base_url: "https://split.test".into(),
			token_secret: "test-secret".into(),
			rate_limits: RateLimitSettings::default(),
		},
		Arc::new(adapter),
	);

	(app, temp_dir)
}

async fn create_session(app: &App, names: &[&str], anonymous: bool) -> CreatedSessionTokens {
	let participants: Vec<NewParticipant<'_>> =
		names.iter().map(|&name| NewParticipant { name, email: None }).collect();

	service::create_session(
		app,
		CreateSessionParams {
			title: "Band gig payout",
			scheduled_at: None,
			evaluation_info: None,
			anonymous,
			participants: &participants,
		},
	)
	.await
	.expect("Failed to create session")
}

fn vote(tokens: &CreatedSessionTokens, target: usize, percent: f64) -> Vote {
	Vote { person_id: tokens.participants[target].0.participant_id, percent }
}

#[tokio::test]
async fn test_create_session_mints_distinct_tokens() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;

	assert_eq!(created.session.status, SessionStatus::Open);
	assert_ne!(created.participants[0].1, created.participants[1].1);
	assert_ne!(created.organizer_token, created.participants[0].1);

	// The access token grants the progress view for exactly this session
	assert_eq!(
		app.tokens.verify_access_token(&created.access_token).unwrap(),
		created.session.sn_id
	);
}

#[tokio::test]
async fn test_sum_invariant_reports_actual_sum() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;
	let token = &created.participants[0].1;

	let allocations = [vote(&created, 0, 60.0), vote(&created, 1, 30.0)];
	let res = service::submit_ballot(&app, token, &allocations, None).await;

	match res {
		Err(Error::ValidationError(msg)) => assert!(msg.contains("90"), "message was: {}", msg),
		other => panic!("expected ValidationError, got {:?}", other),
	}
}

#[tokio::test]
async fn test_sum_tolerance_accepts_rounding_noise() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;
	let token = &created.participants[0].1;

	let allocations = [vote(&created, 0, 50.005), vote(&created, 1, 49.999)];
	service::submit_ballot(&app, token, &allocations, None).await.unwrap();
}

#[tokio::test]
async fn test_resubmission_replaces_not_merges() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;
	let token = &created.participants[0].1;

	let first = [vote(&created, 0, 60.0), vote(&created, 1, 40.0)];
	service::submit_ballot(&app, token, &first, None).await.unwrap();

	let second = [vote(&created, 0, 100.0)];
	service::submit_ballot(&app, token, &second, None).await.unwrap();

	let view = service::read_participant_view(&app, token).await.unwrap();
	assert_eq!(view.votes.len(), 1);
	assert_eq!(view.votes[0].person_id, created.participants[0].0.participant_id);
	assert_eq!(view.votes[0].percent, 100.0);
}

#[tokio::test]
async fn test_zero_percent_votes_are_not_stored() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;
	let token = &created.participants[0].1;

	let allocations = [vote(&created, 0, 100.0), vote(&created, 1, 0.0)];
	service::submit_ballot(&app, token, &allocations, None).await.unwrap();

	let view = service::read_participant_view(&app, token).await.unwrap();
	assert_eq!(view.votes.len(), 1);
}

#[tokio::test]
async fn test_subset_allocation_is_allowed() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob", "Carol"], false).await;
	let token = &created.participants[0].1;

	// Omitting participants is equivalent to rating them 0%
	let allocations = [vote(&created, 1, 100.0)];
	let outcome = service::submit_ballot(&app, token, &allocations, None).await.unwrap();
	assert_eq!(outcome.submitted_count, 1);
	assert_eq!(outcome.total_participants, 3);
}

#[tokio::test]
async fn test_unknown_person_id_rejected() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;
	let token = &created.participants[0].1;

	let allocations = [Vote { person_id: splitvote_types::types::PId(424_242), percent: 100.0 }];
	let res = service::submit_ballot(&app, token, &allocations, None).await;
	assert!(matches!(res, Err(Error::ValidationError(_))));
}

#[tokio::test]
async fn test_unknown_invite_token_is_not_found() {
	let (app, _temp) = test_app().await;
	create_session(&app, &["Alice"], false).await;

	let res = service::submit_ballot(&app, "not-a-real-token", &[], None).await;
	assert!(matches!(res, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_auto_close_fires_once_on_last_submission() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;
	let mut events = app.events.subscribe();

	let a = [vote(&created, 0, 100.0)];
	let outcome = service::submit_ballot(&app, &created.participants[0].1, &a, None).await.unwrap();
	assert!(!outcome.auto_closed);
	assert_eq!(outcome.submitted_count, 1);

	let b = [vote(&created, 0, 50.0), vote(&created, 1, 50.0)];
	let outcome = service::submit_ballot(&app, &created.participants[1].1, &b, None).await.unwrap();
	assert!(outcome.auto_closed);
	assert_eq!(outcome.submitted_count, 2);

	let session = app.vote_adapter.read_session(created.session.sn_id).await.unwrap();
	assert_eq!(session.status, SessionStatus::Closed);

	// Exactly one SessionClosed among the emitted events
	let mut closed = 0;
	while let Ok(event) = events.try_recv() {
		if let VoteEvent::SessionClosed { auto, .. } = event {
			assert!(auto);
			closed += 1;
		}
	}
	assert_eq!(closed, 1);
}

#[tokio::test]
async fn test_closed_session_rejects_submissions_without_trace() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;

	service::close_session(&app, created.session.sn_id, &created.organizer_token)
		.await
		.unwrap();

	let token = &created.participants[0].1;
	let allocations = [vote(&created, 0, 100.0)];
	let res = service::submit_ballot(&app, token, &allocations, None).await;
	assert!(matches!(res, Err(Error::PermissionDenied)));

	// No ballot was stored and the participant is still unsubmitted
	let view = service::read_participant_view(&app, token).await.unwrap();
	assert!(view.votes.is_empty());
	assert!(!view.participant.submitted);
}

#[tokio::test]
async fn test_explicit_close_requires_exact_organizer_token() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice"], false).await;
	let other = create_session(&app, &["Bob"], false).await;

	let res = service::close_session(&app, created.session.sn_id, "wrong-token").await;
	assert!(matches!(res, Err(Error::PermissionDenied)));

	// A valid organizer token for a different session is just as wrong
	let res = service::close_session(&app, created.session.sn_id, &other.organizer_token).await;
	assert!(matches!(res, Err(Error::PermissionDenied)));

	let session =
		service::close_session(&app, created.session.sn_id, &created.organizer_token)
			.await
			.unwrap();
	assert_eq!(session.status, SessionStatus::Closed);

	// Redundant explicit close is a conflict, unlike the silent auto-close race
	let res = service::close_session(&app, created.session.sn_id, &created.organizer_token).await;
	assert!(matches!(res, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn test_aggregation_means_over_raters_only() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;

	let ballot1 = [vote(&created, 0, 100.0)];
	service::submit_ballot(&app, &created.participants[0].1, &ballot1, None).await.unwrap();
	let ballot2 = [vote(&created, 0, 50.0), vote(&created, 1, 50.0)];
	service::submit_ballot(&app, &created.participants[1].1, &ballot2, None).await.unwrap();

	let computed = service::compute_results(&app, created.session.sn_id).await.unwrap();
	assert_eq!(computed.results[0].average_percent, 75.0);
	assert_eq!(computed.results[0].vote_count, 2);
	assert_eq!(computed.results[1].average_percent, 50.0);
	assert_eq!(computed.results[1].vote_count, 1);
	assert!(computed.results[0].voters.is_some());
}

#[tokio::test]
async fn test_anonymous_session_withholds_voter_identity() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], true).await;

	let ballot = [vote(&created, 0, 50.0), vote(&created, 1, 50.0)];
	service::submit_ballot(&app, &created.participants[0].1, &ballot, None).await.unwrap();

	let computed = service::compute_results(&app, created.session.sn_id).await.unwrap();
	assert!(computed.results.iter().all(|r| r.voters.is_none()));
	assert_eq!(computed.results[0].average_percent, 50.0);
}

#[tokio::test]
async fn test_payout_follows_aggregated_shares() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob"], false).await;

	let ballot1 = [vote(&created, 0, 100.0)];
	service::submit_ballot(&app, &created.participants[0].1, &ballot1, None).await.unwrap();
	let ballot2 = [vote(&created, 0, 50.0), vote(&created, 1, 50.0)];
	service::submit_ballot(&app, &created.participants[1].1, &ballot2, None).await.unwrap();

	let computed = service::compute_results(&app, created.session.sn_id).await.unwrap();
	// Averages are A=75, B=50, so the pot splits 60/40
	let shares = payout::compute_payout(&computed.results, 1000.0).unwrap();
	assert_eq!(payout::round_amount(shares[0].amount), 600.0);
	assert_eq!(payout::round_amount(shares[1].amount), 400.0);
}

#[tokio::test]
async fn test_progress_counts() {
	let (app, _temp) = test_app().await;
	let created = create_session(&app, &["Alice", "Bob", "Carol"], false).await;

	let ballot = [vote(&created, 0, 100.0)];
	service::submit_ballot(&app, &created.participants[1].1, &ballot, None).await.unwrap();

	let progress = service::read_progress(&app, created.session.sn_id).await.unwrap();
	assert_eq!(progress.submitted_count, 1);
	assert_eq!(progress.total_participants, 3);
	assert_eq!(progress.session.status, SessionStatus::Open);
}

// vim: ts=4
