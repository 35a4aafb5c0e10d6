//! HTTP handlers for the voting session API

use std::net::SocketAddr;
use std::str::FromStr;

use axum::{
	Json,
	extract::{ConnectInfo, Path, Query, State},
	http::{HeaderMap, StatusCode, header},
};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::payout;
use crate::prelude::*;
use crate::results::ParticipantResult;
use crate::service::{self, CreateSessionParams, NewParticipant};
use splitvote_core::schedule::{Frequency, RecurrenceRule};
use splitvote_types::types::ApiResponse;
use splitvote_types::vote_adapter::{Ballot, Participant, Vote, VoteAdapter, VotingSession};

/// Extract the bearer credential from the Authorization header
fn bearer(headers: &HeaderMap) -> SvResult<&str> {
	headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "))
		.ok_or(Error::PermissionDenied)
}

// Session creation //
//******************//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParticipantRequest {
	pub name: String,
	pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
	pub title: String,
	pub scheduled_at: Option<Timestamp>,
	pub evaluation_info: Option<String>,
	#[serde(default)]
	pub is_anonymous: bool,
	pub participants: Vec<NewParticipantRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitedParticipant {
	pub participant_id: PId,
	pub name: Box<str>,
	pub invite_token: String,
	pub invite_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
	pub session: VotingSession,
	/// Secret controlling close/payout; shown exactly once
	pub organizer_token: String,
	/// Signed, expiring token for the organizer progress view
	pub access_token: String,
	pub participants: Vec<InvitedParticipant>,
}

/// POST /api/session - Create a voting session with its participant roster
pub async fn post_session(
	State(app): State<App>,
	ConnectInfo(addr): ConnectInfo<SocketAddr>,
	Json(req): Json<CreateSessionRequest>,
) -> SvResult<(StatusCode, Json<ApiResponse<CreateSessionResponse>>)> {
	app.rate_limiter
		.check("session.create", &addr.ip().to_string(), &app.opts.rate_limits.session_create)
		.map_err(Error::from)?;

	let participants: Vec<NewParticipant<'_>> = req
		.participants
		.iter()
		.map(|p| NewParticipant { name: &p.name, email: p.email.as_deref() })
		.collect();

	let created = service::create_session(
		&app,
		CreateSessionParams {
			title: &req.title,
			scheduled_at: req.scheduled_at,
			evaluation_info: req.evaluation_info.as_deref(),
			anonymous: req.is_anonymous,
			participants: &participants,
		},
	)
	.await?;

	let response = CreateSessionResponse {
		organizer_token: created.organizer_token,
		access_token: created.access_token.to_string(),
		participants: created
			.participants
			.into_iter()
			.map(|(participant, invite_token)| InvitedParticipant {
				invite_url: format!("{}/vote/{}", app.opts.base_url, invite_token),
				participant_id: participant.participant_id,
				name: participant.name,
				invite_token,
			})
			.collect(),
		session: created.session,
	};

	Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

// Ballots //
//*********//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantViewResponse {
	pub session: VotingSession,
	pub participant: Participant,
	pub roster: Vec<Participant>,
	pub votes: Vec<Vote>,
}

/// GET /api/vote/{invite_token} - What a participant sees on their invite link
pub async fn get_vote(
	State(app): State<App>,
	Path(invite_token): Path<String>,
) -> SvResult<(StatusCode, Json<ApiResponse<ParticipantViewResponse>>)> {
	let view = service::read_participant_view(&app, &invite_token).await?;

	let response = ParticipantViewResponse {
		session: view.session,
		participant: view.participant,
		roster: view.roster,
		votes: view.votes,
	};

	Ok((StatusCode::OK, Json(ApiResponse::new(response))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBallotRequest {
	pub allocations: Vec<Vote>,
	/// Authenticated identity injected by an upstream auth layer, if any
	pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBallotResponse {
	pub ballot: Ballot,
	pub auto_closed: bool,
	pub submitted_count: u32,
	pub total_participants: u32,
}

/// PUT /api/vote/{invite_token} - Submit or replace a percentage allocation
pub async fn put_vote(
	State(app): State<App>,
	ConnectInfo(addr): ConnectInfo<SocketAddr>,
	Path(invite_token): Path<String>,
	Json(req): Json<SubmitBallotRequest>,
) -> SvResult<(StatusCode, Json<ApiResponse<SubmitBallotResponse>>)> {
	app.rate_limiter
		.check("ballot.submit", &addr.ip().to_string(), &app.opts.rate_limits.ballot_submit)
		.map_err(Error::from)?;

	let outcome =
		service::submit_ballot(&app, &invite_token, &req.allocations, req.user_id.as_deref())
			.await?;

	let response = SubmitBallotResponse {
		ballot: outcome.ballot,
		auto_closed: outcome.auto_closed,
		submitted_count: outcome.submitted_count,
		total_participants: outcome.total_participants,
	};

	Ok((StatusCode::OK, Json(ApiResponse::new(response))))
}

// Session lifecycle & results //
//*****************************//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
	pub session: VotingSession,
}

/// POST /api/session/{sn_id}/close - Explicit close (bearer = organizer token)
pub async fn post_close(
	State(app): State<App>,
	ConnectInfo(addr): ConnectInfo<SocketAddr>,
	Path(sn_id): Path<SnId>,
	headers: HeaderMap,
) -> SvResult<(StatusCode, Json<ApiResponse<SessionResponse>>)> {
	app.rate_limiter
		.check("session.close", &addr.ip().to_string(), &app.opts.rate_limits.session_close)
		.map_err(Error::from)?;

	let organizer_token = bearer(&headers)?;
	let session = service::close_session(&app, sn_id, organizer_token).await?;

	Ok((StatusCode::OK, Json(ApiResponse::new(SessionResponse { session }))))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
	pub session: VotingSession,
	pub submitted_count: u32,
	pub total_participants: u32,
}

/// GET /api/session/{sn_id} - Organizer progress view (bearer = access token)
pub async fn get_session(
	State(app): State<App>,
	Path(sn_id): Path<SnId>,
	headers: HeaderMap,
) -> SvResult<(StatusCode, Json<ApiResponse<ProgressResponse>>)> {
	let granted = app.tokens.verify_access_token(bearer(&headers)?)?;
	if granted != sn_id {
		return Err(Error::PermissionDenied);
	}

	let progress = service::read_progress(&app, sn_id).await?;

	Ok((
		StatusCode::OK,
		Json(ApiResponse::new(ProgressResponse {
			session: progress.session,
			submitted_count: progress.submitted_count,
			total_participants: progress.total_participants,
		})),
	))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
	pub session: VotingSession,
	pub results: Vec<ParticipantResult>,
}

/// GET /api/session/{sn_id}/results - Aggregated results, anonymity gated
pub async fn get_results(
	State(app): State<App>,
	Path(sn_id): Path<SnId>,
) -> SvResult<(StatusCode, Json<ApiResponse<ResultsResponse>>)> {
	let computed = service::compute_results(&app, sn_id).await?;

	Ok((
		StatusCode::OK,
		Json(ApiResponse::new(ResultsResponse {
			session: computed.session,
			results: computed.results,
		})),
	))
}

// Payout //
//********//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
	pub total_amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRow {
	pub name: Box<str>,
	pub percent: f64,
	/// Rounded to two decimals for display; rows may not sum exactly to the
	/// requested total
	pub amount: f64,
}

/// POST /api/session/{sn_id}/payout - Proportional split (bearer = organizer token)
pub async fn post_payout(
	State(app): State<App>,
	Path(sn_id): Path<SnId>,
	headers: HeaderMap,
	Json(req): Json<PayoutRequest>,
) -> SvResult<(StatusCode, Json<ApiResponse<Vec<PayoutRow>>>)> {
	let organizer_token = bearer(&headers)?;
	let session = app
		.vote_adapter
		.read_session_by_organizer_token(organizer_token)
		.await
		.map_err(|_| Error::PermissionDenied)?;
	if session.sn_id != sn_id {
		return Err(Error::PermissionDenied);
	}

	let computed = service::compute_results(&app, sn_id).await?;
	let shares = payout::compute_payout(&computed.results, req.total_amount)?;

	let rows = shares
		.into_iter()
		.map(|share| PayoutRow {
			name: share.name,
			percent: payout::round_amount(share.percent),
			amount: payout::round_amount(share.amount),
		})
		.collect();

	Ok((StatusCode::OK, Json(ApiResponse::new(rows))))
}

// Recurrence //
//************//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRunQuery {
	pub frequency: Frequency,
	pub day_of_week: Option<String>,
	pub day_of_month: Option<u32>,
	/// "HH:MM" or "HH:MM:SS"
	pub time: String,
	/// Reference timestamp; defaults to now
	pub from: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRunResponse {
	pub next_run: Timestamp,
}

/// GET /api/schedule/next-run - Next trigger for a recurrence rule
pub async fn get_next_run(
	Query(query): Query<NextRunQuery>,
) -> SvResult<(StatusCode, Json<ApiResponse<NextRunResponse>>)> {
	let day_of_week = query
		.day_of_week
		.as_deref()
		.map(|s| {
			Weekday::from_str(s)
				.map_err(|_| Error::ValidationError(format!("invalid day of week '{}'", s)))
		})
		.transpose()?;

	let time = NaiveTime::parse_from_str(&query.time, "%H:%M")
		.or_else(|_| NaiveTime::parse_from_str(&query.time, "%H:%M:%S"))
		.map_err(|_| Error::ValidationError(format!("invalid time '{}'", query.time)))?;

	let from = match query.from {
		Some(ts) => DateTime::<Utc>::from_timestamp(ts.0, 0)
			.ok_or_else(|| Error::ValidationError(format!("invalid timestamp {}", ts)))?,
		None => Utc::now(),
	};

	let rule = RecurrenceRule {
		frequency: query.frequency,
		day_of_week,
		day_of_month: query.day_of_month,
		time,
	};
	let next_run = rule.next_run(from)?;

	Ok((
		StatusCode::OK,
		Json(ApiResponse::new(NextRunResponse { next_run: Timestamp(next_run.timestamp()) })),
	))
}

// vim: ts=4
