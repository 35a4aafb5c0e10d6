//! Adapter that stores voting sessions, participants, ballots and votes.
//!
//! All session state lives behind this trait; the engine never reads or
//! mutates persisted state except through the operations declared here.
//! The ballot upsert is the one multi-step mutation, and implementations
//! must apply it as a single atomic unit of work.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;

/// Lifecycle state of a voting session
///
/// The only transition is `Open` → `Closed`; `Closed` is terminal and the
/// session becomes read-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
	Open,
	Closed,
}

impl SessionStatus {
	pub fn as_char(self) -> char {
		match self {
			SessionStatus::Open => 'O',
			SessionStatus::Closed => 'C',
		}
	}

	pub fn from_char(c: char) -> SvResult<Self> {
		match c {
			'O' => Ok(SessionStatus::Open),
			'C' => Ok(SessionStatus::Closed),
			_ => Err(Error::DbError(format!("invalid session status '{}'", c))),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BallotStatus {
	Draft,
	Submitted,
}

impl BallotStatus {
	pub fn as_char(self) -> char {
		match self {
			BallotStatus::Draft => 'D',
			BallotStatus::Submitted => 'S',
		}
	}

	pub fn from_char(c: char) -> SvResult<Self> {
		match c {
			'D' => Ok(BallotStatus::Draft),
			'S' => Ok(BallotStatus::Submitted),
			_ => Err(Error::DbError(format!("invalid ballot status '{}'", c))),
		}
	}
}

/// One cost/contribution vote among a fixed set of participants
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSession {
	pub sn_id: SnId,
	pub title: Box<str>,
	/// Optional date/time the vote is about (a dinner, a sprint, a gig)
	pub scheduled_at: Option<Timestamp>,
	/// Free-text guidance shown to voters
	pub evaluation_info: Option<Box<str>>,
	/// Immutable after creation; gates voter identity in results
	pub anonymous: bool,
	pub status: SessionStatus,
	pub created_at: Timestamp,
}

/// One invited voter of a session
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
	pub participant_id: PId,
	pub sn_id: SnId,
	pub name: Box<str>,
	pub email: Option<Box<str>>,
	pub submitted: bool,
	/// Authenticated identity bound opportunistically at submission time
	pub user_id: Option<Box<str>>,
}

/// One participant's complete percentage allocation
///
/// Keyed by the one-way hash of the owning participant's invite token, never
/// by the raw token itself.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
	pub ballot_key: Box<str>,
	pub sn_id: SnId,
	pub participant_id: PId,
	pub status: BallotStatus,
	pub submitted_at: Option<Timestamp>,
}

/// A single (target participant, percent) pair within a ballot
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
	pub person_id: PId,
	pub percent: f64,
}

/// Data needed to create one participant of a new session
#[derive(Debug)]
pub struct CreateParticipantData<'a> {
	pub name: &'a str,
	pub email: Option<&'a str>,
	pub invite_token: &'a str,
}

/// Data needed to create a new session
#[derive(Debug)]
pub struct CreateSessionData<'a> {
	pub title: &'a str,
	pub scheduled_at: Option<Timestamp>,
	pub evaluation_info: Option<&'a str>,
	pub anonymous: bool,
	pub organizer_token: &'a str,
	pub participants: &'a [CreateParticipantData<'a>],
}

/// A freshly created session with its participant roster
#[derive(Debug)]
pub struct CreatedSession {
	pub session: VotingSession,
	pub participants: Vec<Participant>,
}

/// Data for the atomic ballot upsert
#[derive(Debug)]
pub struct StoreBallotData<'a> {
	pub ballot_key: &'a str,
	/// Full replacement vote set; zero-percent votes are already dropped
	pub votes: &'a [Vote],
	/// Submitter identity to bind if the participant has none yet
	pub user_id: Option<&'a str>,
}

/// Submission progress after a ballot upsert
#[derive(Clone, Copy, Debug)]
pub struct SubmitCounts {
	pub submitted: u32,
	pub total: u32,
}

/// A Splitvote persistence adapter
///
/// Implementations are expected to enforce unique constraints on the
/// organizer token, on each invite token, and on the hashed ballot key, and
/// to report violations as `Error::Conflict` so callers can retry natural
/// keys.
#[async_trait]
pub trait VoteAdapter: Debug + Send + Sync {
	/// Creates a session together with its full participant roster
	async fn create_session(&self, data: &CreateSessionData<'_>) -> SvResult<CreatedSession>;

	/// Reads a session by id
	async fn read_session(&self, sn_id: SnId) -> SvResult<VotingSession>;

	/// Reads a session by its organizer token (direct secret-as-key lookup)
	async fn read_session_by_organizer_token(&self, token: &str) -> SvResult<VotingSession>;

	/// Resolves an invite token to its participant and owning session
	async fn read_participant_by_invite_token(
		&self,
		token: &str,
	) -> SvResult<(VotingSession, Participant)>;

	/// Lists the participants of a session in insertion order
	async fn list_participants(&self, sn_id: SnId) -> SvResult<Vec<Participant>>;

	/// Reads a ballot and its votes by hashed key; `None` if no ballot yet
	async fn read_ballot(&self, ballot_key: &str) -> SvResult<Option<(Ballot, Vec<Vote>)>>;

	/// Atomically replaces the participant's ballot with the given vote set
	///
	/// In one unit of work: deletes the previous vote set, upserts the ballot
	/// row as `Submitted` with a fresh `submitted_at`, marks the participant
	/// as submitted, binds `user_id` if provided and not already set, and
	/// recomputes the submitted/total counts.
	async fn store_ballot(
		&self,
		sn_id: SnId,
		participant_id: PId,
		data: &StoreBallotData<'_>,
	) -> SvResult<(Ballot, SubmitCounts)>;

	/// Transitions the session `Open` → `Closed`
	///
	/// Guarded so a redundant close is a no-op: returns `true` only for the
	/// call that actually performed the transition.
	async fn close_session(&self, sn_id: SnId) -> SvResult<bool>;

	/// Lists all submitted ballots of a session with their votes
	async fn list_submitted_ballots(&self, sn_id: SnId) -> SvResult<Vec<(Ballot, Vec<Vote>)>>;
}

// vim: ts=4
