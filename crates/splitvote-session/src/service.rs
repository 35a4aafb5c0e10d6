//! Internal service functions for the voting session lifecycle
//!
//! Handlers stay thin; everything with an invariant lives here: session
//! creation with natural-key retry, the ballot submission protocol with its
//! 100%-sum check, the idempotent auto-close, and organizer-gated close.

use std::collections::HashSet;

use crate::prelude::*;
use crate::results::{self, ParticipantResult};
use splitvote_core::events::VoteEvent;
use splitvote_types::vote_adapter::{
	Ballot, CreateParticipantData, CreateSessionData, Participant, SessionStatus, StoreBallotData,
	Vote, VoteAdapter, VotingSession,
};

/// Attempts at inserting freshly generated natural-key tokens before the
/// collision is treated as a real fault
const TOKEN_INSERT_RETRIES: u32 = 3;

/// Absolute tolerance on the 100% allocation sum
pub const SUM_TOLERANCE: f64 = 0.01;

/// Parameters for creating a session
#[derive(Debug)]
pub struct CreateSessionParams<'a> {
	pub title: &'a str,
	pub scheduled_at: Option<Timestamp>,
	pub evaluation_info: Option<&'a str>,
	pub anonymous: bool,
	pub participants: &'a [NewParticipant<'a>],
}

#[derive(Debug)]
pub struct NewParticipant<'a> {
	pub name: &'a str,
	pub email: Option<&'a str>,
}

/// A created session with the secrets that exist only in this response
#[derive(Debug)]
pub struct CreatedSessionTokens {
	pub session: VotingSession,
	pub organizer_token: String,
	pub access_token: Box<str>,
	/// Roster in insertion order, each with its invite token
	pub participants: Vec<(Participant, String)>,
}

/// Create a session and its participant roster, minting all tokens
///
/// Token generation has negligible collision probability, but the tokens are
/// natural keys, so a unique violation is retried with fresh tokens instead
/// of being surfaced.
pub async fn create_session(
	app: &App,
	params: CreateSessionParams<'_>,
) -> SvResult<CreatedSessionTokens> {
	if params.title.trim().is_empty() {
		return Err(Error::ValidationError("session title must not be empty".into()));
	}
	if params.participants.is_empty() {
		return Err(Error::ValidationError("a session needs at least one participant".into()));
	}
	if let Some(unnamed) = params.participants.iter().position(|p| p.name.trim().is_empty()) {
		return Err(Error::ValidationError(format!(
			"participant #{} has an empty name",
			unnamed + 1
		)));
	}

	let mut last_conflict = None;
	for _attempt in 0..TOKEN_INSERT_RETRIES {
		let organizer_token = app.tokens.generate_token()?;
		let invite_tokens = params
			.participants
			.iter()
			.map(|_| app.tokens.generate_token())
			.collect::<SvResult<Vec<_>>>()?;

		let participant_data = params
			.participants
			.iter()
			.zip(&invite_tokens)
			.map(|(p, token)| CreateParticipantData {
				name: p.name,
				email: p.email,
				invite_token: token,
			})
			.collect::<Vec<_>>();

		let data = CreateSessionData {
			title: params.title,
			scheduled_at: params.scheduled_at,
			evaluation_info: params.evaluation_info,
			anonymous: params.anonymous,
			organizer_token: &organizer_token,
			participants: &participant_data,
		};

		match app.vote_adapter.create_session(&data).await {
			Ok(created) => {
				let access_token = app.tokens.create_access_token(created.session.sn_id)?;
				info!(
					sn_id = %created.session.sn_id,
					participants = created.participants.len(),
					"Created voting session"
				);
				return Ok(CreatedSessionTokens {
					session: created.session,
					organizer_token,
					access_token,
					participants: created
						.participants
						.into_iter()
						.zip(invite_tokens)
						.collect(),
				});
			}
			Err(Error::Conflict(msg)) => {
				warn!("Token collision on session create, regenerating: {}", msg);
				last_conflict = Some(Error::Conflict(msg));
			}
			Err(err) => return Err(err),
		}
	}

	Err(last_conflict.unwrap_or_else(|| Error::Internal("token generation exhausted".into())))
}

/// Outcome of a ballot submission
#[derive(Debug)]
pub struct SubmitOutcome {
	pub ballot: Ballot,
	/// True when this submission completed the session (the Open → Closed
	/// transition happened because everyone has now submitted)
	pub auto_closed: bool,
	pub submitted_count: u32,
	pub total_participants: u32,
}

/// Submit (or resubmit) a participant's percentage allocation
///
/// Validation order is fixed and fails fast: token resolution, session
/// state, allocation values and sum, roster membership. A resubmission
/// replaces the stored vote set wholesale.
pub async fn submit_ballot(
	app: &App,
	invite_token: &str,
	allocations: &[Vote],
	user_id: Option<&str>,
) -> SvResult<SubmitOutcome> {
	// 1. Resolve the invite token
	let (session, participant) =
		app.vote_adapter.read_participant_by_invite_token(invite_token).await?;

	// 2. Closed sessions are read-only
	if session.status != SessionStatus::Open {
		debug!(sn_id = %session.sn_id, "Submission against closed session rejected");
		return Err(Error::PermissionDenied);
	}

	// 3. Percent values and the 100% sum
	if let Some(bad) = allocations
		.iter()
		.find(|v| !v.percent.is_finite() || !(0.0..=100.0).contains(&v.percent))
	{
		return Err(Error::ValidationError(format!(
			"percent {} for person {} out of range (0-100)",
			bad.percent, bad.person_id
		)));
	}
	let sum: f64 = allocations.iter().map(|v| v.percent).sum();
	if (sum - 100.0).abs() > SUM_TOLERANCE {
		return Err(Error::ValidationError(format!(
			"allocation sum was {}%, must be 100%",
			sum
		)));
	}

	// 4. Every referenced person belongs to this session, exactly once
	let roster = app.vote_adapter.list_participants(session.sn_id).await?;
	let known: HashSet<PId> = roster.iter().map(|p| p.participant_id).collect();
	let mut seen = HashSet::new();
	for vote in allocations {
		if !known.contains(&vote.person_id) {
			return Err(Error::ValidationError(format!(
				"person {} is not a participant of this session",
				vote.person_id
			)));
		}
		if !seen.insert(vote.person_id) {
			return Err(Error::ValidationError(format!(
				"duplicate allocation for person {}",
				vote.person_id
			)));
		}
	}

	// Omitted participants are 0% votes; stored zero rows would say the same
	let votes: Vec<Vote> = allocations.iter().filter(|v| v.percent > 0.0).copied().collect();

	let ballot_key = app.tokens.ballot_key(invite_token);
	let (ballot, counts) = app
		.vote_adapter
		.store_ballot(
			session.sn_id,
			participant.participant_id,
			&StoreBallotData { ballot_key: &ballot_key, votes: &votes, user_id },
		)
		.await?;

	app.events.emit(VoteEvent::BallotSubmitted {
		sn_id: session.sn_id,
		participant_id: participant.participant_id,
		submitted: counts.submitted,
		total: counts.total,
	});

	// Auto-close once everyone has submitted. Two racing final submissions
	// both reach this point; the adapter transition is guarded, so only one
	// observes `true` and the other stays a silent no-op.
	let complete = counts.submitted >= counts.total;
	if complete {
		let transitioned = app.vote_adapter.close_session(session.sn_id).await?;
		if transitioned {
			info!(sn_id = %session.sn_id, "Session auto-closed, all participants submitted");
			app.events.emit(VoteEvent::SessionClosed { sn_id: session.sn_id, auto: true });
		}
	}

	Ok(SubmitOutcome {
		ballot,
		auto_closed: complete,
		submitted_count: counts.submitted,
		total_participants: counts.total,
	})
}

/// Explicitly close a session on behalf of its organizer
pub async fn close_session(
	app: &App,
	sn_id: SnId,
	organizer_token: &str,
) -> SvResult<VotingSession> {
	// The organizer token is the credential; a token that resolves to a
	// different session is as wrong as one that resolves to none.
	let session = app
		.vote_adapter
		.read_session_by_organizer_token(organizer_token)
		.await
		.map_err(|_| Error::PermissionDenied)?;
	if session.sn_id != sn_id {
		return Err(Error::PermissionDenied);
	}

	if session.status == SessionStatus::Closed {
		return Err(Error::Conflict("session is already closed".into()));
	}

	let transitioned = app.vote_adapter.close_session(sn_id).await?;
	if transitioned {
		info!(sn_id = %sn_id, "Session closed by organizer");
		app.events.emit(VoteEvent::SessionClosed { sn_id, auto: false });
	} else {
		// Lost the race against an auto-close between read and update
		return Err(Error::Conflict("session is already closed".into()));
	}

	app.vote_adapter.read_session(sn_id).await
}

/// What a participant sees when opening their invite link
#[derive(Debug)]
pub struct ParticipantView {
	pub session: VotingSession,
	pub participant: Participant,
	pub roster: Vec<Participant>,
	/// Previously stored allocation, for prefilling the form
	pub votes: Vec<Vote>,
}

pub async fn read_participant_view(app: &App, invite_token: &str) -> SvResult<ParticipantView> {
	let (session, participant) =
		app.vote_adapter.read_participant_by_invite_token(invite_token).await?;
	let roster = app.vote_adapter.list_participants(session.sn_id).await?;

	let ballot_key = app.tokens.ballot_key(invite_token);
	let votes = match app.vote_adapter.read_ballot(&ballot_key).await? {
		Some((_ballot, votes)) => votes,
		None => Vec::new(),
	};

	Ok(ParticipantView { session, participant, roster, votes })
}

/// Aggregated results of a session
#[derive(Debug)]
pub struct SessionResults {
	pub session: VotingSession,
	pub results: Vec<ParticipantResult>,
}

/// Compute per-participant mean allocations for an open or closed session
pub async fn compute_results(app: &App, sn_id: SnId) -> SvResult<SessionResults> {
	let session = app.vote_adapter.read_session(sn_id).await?;
	let participants = app.vote_adapter.list_participants(sn_id).await?;
	let ballots = app.vote_adapter.list_submitted_ballots(sn_id).await?;

	let results = results::aggregate(&participants, &ballots, session.anonymous);
	Ok(SessionResults { session, results })
}

/// Submission progress for the organizer view
#[derive(Debug)]
pub struct SessionProgress {
	pub session: VotingSession,
	pub submitted_count: u32,
	pub total_participants: u32,
}

pub async fn read_progress(app: &App, sn_id: SnId) -> SvResult<SessionProgress> {
	let session = app.vote_adapter.read_session(sn_id).await?;
	let participants = app.vote_adapter.list_participants(sn_id).await?;
	let submitted_count = participants.iter().filter(|p| p.submitted).count() as u32;

	Ok(SessionProgress {
		session,
		submitted_count,
		total_participants: participants.len() as u32,
	})
}

// vim: ts=4
