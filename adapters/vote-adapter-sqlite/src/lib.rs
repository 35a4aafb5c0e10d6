//! SQLite-backed implementation of the Splitvote `VoteAdapter`.
//!
//! Sessions, participants, ballots and votes live in one SQLite database in
//! WAL mode. The unique constraints the engine relies on (organizer token,
//! invite token, hashed ballot key, one ballot per participant) are enforced
//! here, and unique violations are reported as `Error::Conflict` so the
//! service layer can retry natural keys.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

mod schema;

use std::path::Path;

use async_trait::async_trait;
use sqlx::{
	Row,
	sqlite::{self, SqlitePool, SqliteRow},
};

use splitvote::{
	prelude::*,
	vote_adapter::{
		Ballot, BallotStatus, CreateSessionData, CreatedSession, Participant, SessionStatus,
		StoreBallotData, SubmitCounts, Vote, VoteAdapter, VotingSession,
	},
};

fn db_err(err: sqlx::Error) -> Error {
	match err {
		sqlx::Error::RowNotFound => Error::NotFound,
		err => {
			if let sqlx::Error::Database(ref db) = err {
				if db.is_unique_violation() {
					return Error::Conflict(db.message().to_string());
				}
			}
			warn!("DB: {:#?}", err);
			Error::DbError(err.to_string())
		}
	}
}

fn status_char(row: &SqliteRow, column: &str) -> SvResult<char> {
	let status: String = row.try_get(column).map_err(db_err)?;
	status.chars().next().ok_or_else(|| Error::DbError(format!("empty {} column", column)))
}

fn map_session(row: &SqliteRow) -> SvResult<VotingSession> {
	Ok(VotingSession {
		sn_id: SnId(row.try_get("sn_id").map_err(db_err)?),
		title: row.try_get::<String, _>("title").map_err(db_err)?.into(),
		scheduled_at: row
			.try_get::<Option<i64>, _>("scheduled_at")
			.map_err(db_err)?
			.map(Timestamp),
		evaluation_info: row
			.try_get::<Option<String>, _>("evaluation_info")
			.map_err(db_err)?
			.map(Into::into),
		anonymous: row.try_get("anonymous").map_err(db_err)?,
		status: SessionStatus::from_char(status_char(row, "status")?)?,
		created_at: Timestamp(row.try_get("created_at").map_err(db_err)?),
	})
}

fn map_participant(row: &SqliteRow) -> SvResult<Participant> {
	Ok(Participant {
		participant_id: PId(row.try_get("participant_id").map_err(db_err)?),
		sn_id: SnId(row.try_get("sn_id").map_err(db_err)?),
		name: row.try_get::<String, _>("name").map_err(db_err)?.into(),
		email: row.try_get::<Option<String>, _>("email").map_err(db_err)?.map(Into::into),
		submitted: row.try_get("submitted").map_err(db_err)?,
		user_id: row.try_get::<Option<String>, _>("user_id").map_err(db_err)?.map(Into::into),
	})
}

fn map_ballot(row: &SqliteRow) -> SvResult<Ballot> {
	Ok(Ballot {
		ballot_key: row.try_get::<String, _>("ballot_key").map_err(db_err)?.into(),
		sn_id: SnId(row.try_get("sn_id").map_err(db_err)?),
		participant_id: PId(row.try_get("participant_id").map_err(db_err)?),
		status: BallotStatus::from_char(status_char(row, "status")?)?,
		submitted_at: row
			.try_get::<Option<i64>, _>("submitted_at")
			.map_err(db_err)?
			.map(Timestamp),
	})
}

#[derive(Debug)]
pub struct VoteAdapterSqlite {
	db: SqlitePool,
}

impl VoteAdapterSqlite {
	pub async fn new(path: impl AsRef<Path>) -> SvResult<Self> {
		let opts = sqlite::SqliteConnectOptions::new()
			.filename(path.as_ref())
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.map_err(db_err)?;

		schema::init_db(&db).await.map_err(db_err)?;

		Ok(Self { db })
	}
}

#[async_trait]
impl VoteAdapter for VoteAdapterSqlite {
	async fn create_session(&self, data: &CreateSessionData<'_>) -> SvResult<CreatedSession> {
		let mut tx = self.db.begin().await.map_err(db_err)?;

		let row = sqlx::query(
			"INSERT INTO sessions (title, scheduled_at, evaluation_info, anonymous, status, organizer_token, created_at)
			VALUES (?1, ?2, ?3, ?4, 'O', ?5, unixepoch())
			RETURNING sn_id, title, scheduled_at, evaluation_info, anonymous, status, created_at",
		)
		.bind(data.title)
		.bind(data.scheduled_at.map(|ts| ts.0))
		.bind(data.evaluation_info)
		.bind(data.anonymous)
		.bind(data.organizer_token)
		.fetch_one(&mut *tx)
		.await
		.map_err(db_err)?;
		let session = map_session(&row)?;

		let mut participants = Vec::with_capacity(data.participants.len());
		for p in data.participants {
			let row = sqlx::query(
				"INSERT INTO participants (sn_id, name, email, invite_token)
				VALUES (?1, ?2, ?3, ?4)
				RETURNING participant_id, sn_id, name, email, submitted, user_id",
			)
			.bind(session.sn_id.0)
			.bind(p.name)
			.bind(p.email)
			.bind(p.invite_token)
			.fetch_one(&mut *tx)
			.await
			.map_err(db_err)?;
			participants.push(map_participant(&row)?);
		}

		tx.commit().await.map_err(db_err)?;

		Ok(CreatedSession { session, participants })
	}

	async fn read_session(&self, sn_id: SnId) -> SvResult<VotingSession> {
		let row = sqlx::query(
			"SELECT sn_id, title, scheduled_at, evaluation_info, anonymous, status, created_at
			FROM sessions WHERE sn_id = ?1",
		)
		.bind(sn_id.0)
		.fetch_one(&self.db)
		.await
		.map_err(db_err)?;

		map_session(&row)
	}

	async fn read_session_by_organizer_token(&self, token: &str) -> SvResult<VotingSession> {
		let row = sqlx::query(
			"SELECT sn_id, title, scheduled_at, evaluation_info, anonymous, status, created_at
			FROM sessions WHERE organizer_token = ?1",
		)
		.bind(token)
		.fetch_one(&self.db)
		.await
		.map_err(db_err)?;

		map_session(&row)
	}

	async fn read_participant_by_invite_token(
		&self,
		token: &str,
	) -> SvResult<(VotingSession, Participant)> {
		let row = sqlx::query(
			"SELECT s.sn_id, s.title, s.scheduled_at, s.evaluation_info, s.anonymous, s.status,
				s.created_at,
				p.participant_id, p.name, p.email, p.submitted, p.user_id
			FROM participants p
			JOIN sessions s ON s.sn_id = p.sn_id
			WHERE p.invite_token = ?1",
		)
		.bind(token)
		.fetch_one(&self.db)
		.await
		.map_err(db_err)?;

		Ok((map_session(&row)?, map_participant(&row)?))
	}

	async fn list_participants(&self, sn_id: SnId) -> SvResult<Vec<Participant>> {
		let rows = sqlx::query(
			"SELECT participant_id, sn_id, name, email, submitted, user_id
			FROM participants WHERE sn_id = ?1 ORDER BY participant_id",
		)
		.bind(sn_id.0)
		.fetch_all(&self.db)
		.await
		.map_err(db_err)?;

		rows.iter().map(map_participant).collect()
	}

	async fn read_ballot(&self, ballot_key: &str) -> SvResult<Option<(Ballot, Vec<Vote>)>> {
		let row = sqlx::query(
			"SELECT ballot_key, sn_id, participant_id, status, submitted_at
			FROM ballots WHERE ballot_key = ?1",
		)
		.bind(ballot_key)
		.fetch_optional(&self.db)
		.await
		.map_err(db_err)?;

		let Some(row) = row else { return Ok(None) };
		let ballot = map_ballot(&row)?;

		let votes = sqlx::query(
			"SELECT person_id, percent FROM votes WHERE ballot_key = ?1 ORDER BY person_id",
		)
		.bind(ballot_key)
		.fetch_all(&self.db)
		.await
		.map_err(db_err)?
		.iter()
		.map(|row| {
			Ok(Vote {
				person_id: PId(row.try_get("person_id").map_err(db_err)?),
				percent: row.try_get("percent").map_err(db_err)?,
			})
		})
		.collect::<SvResult<Vec<_>>>()?;

		Ok(Some((ballot, votes)))
	}

	async fn store_ballot(
		&self,
		sn_id: SnId,
		participant_id: PId,
		data: &StoreBallotData<'_>,
	) -> SvResult<(Ballot, SubmitCounts)> {
		let now = Timestamp::now();
		let mut tx = self.db.begin().await.map_err(db_err)?;

		// Replace, never merge: the previous vote set goes away wholesale
		sqlx::query("DELETE FROM votes WHERE ballot_key = ?1")
			.bind(data.ballot_key)
			.execute(&mut *tx)
			.await
			.map_err(db_err)?;

		sqlx::query(
			"INSERT INTO ballots (ballot_key, sn_id, participant_id, status, submitted_at)
			VALUES (?1, ?2, ?3, 'S', ?4)
			ON CONFLICT(ballot_key) DO UPDATE SET status = 'S', submitted_at = ?4",
		)
		.bind(data.ballot_key)
		.bind(sn_id.0)
		.bind(participant_id.0)
		.bind(now.0)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;

		for vote in data.votes {
			sqlx::query("INSERT INTO votes (ballot_key, person_id, percent) VALUES (?1, ?2, ?3)")
				.bind(data.ballot_key)
				.bind(vote.person_id.0)
				.bind(vote.percent)
				.execute(&mut *tx)
				.await
				.map_err(db_err)?;
		}

		sqlx::query(
			"UPDATE participants SET submitted = 1, user_id = COALESCE(user_id, ?2)
			WHERE participant_id = ?1",
		)
		.bind(participant_id.0)
		.bind(data.user_id)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;

		let row = sqlx::query(
			"SELECT count(*) AS total, COALESCE(sum(submitted), 0) AS submitted
			FROM participants WHERE sn_id = ?1",
		)
		.bind(sn_id.0)
		.fetch_one(&mut *tx)
		.await
		.map_err(db_err)?;
		let counts = SubmitCounts {
			submitted: row.try_get::<i64, _>("submitted").map_err(db_err)? as u32,
			total: row.try_get::<i64, _>("total").map_err(db_err)? as u32,
		};

		tx.commit().await.map_err(db_err)?;

		let ballot = Ballot {
			ballot_key: data.ballot_key.into(),
			sn_id,
			participant_id,
			status: BallotStatus::Submitted,
			submitted_at: Some(now),
		};

		Ok((ballot, counts))
	}

	async fn close_session(&self, sn_id: SnId) -> SvResult<bool> {
		// Guarded transition: only the first writer flips Open → Closed
		let res = sqlx::query("UPDATE sessions SET status = 'C' WHERE sn_id = ?1 AND status = 'O'")
			.bind(sn_id.0)
			.execute(&self.db)
			.await
			.map_err(db_err)?;

		Ok(res.rows_affected() > 0)
	}

	async fn list_submitted_ballots(&self, sn_id: SnId) -> SvResult<Vec<(Ballot, Vec<Vote>)>> {
		let ballot_rows = sqlx::query(
			"SELECT ballot_key, sn_id, participant_id, status, submitted_at
			FROM ballots WHERE sn_id = ?1 AND status = 'S' ORDER BY participant_id",
		)
		.bind(sn_id.0)
		.fetch_all(&self.db)
		.await
		.map_err(db_err)?;

		let vote_rows = sqlx::query(
			"SELECT v.ballot_key, v.person_id, v.percent
			FROM votes v
			JOIN ballots b ON b.ballot_key = v.ballot_key
			WHERE b.sn_id = ?1 AND b.status = 'S'
			ORDER BY v.person_id",
		)
		.bind(sn_id.0)
		.fetch_all(&self.db)
		.await
		.map_err(db_err)?;

		let mut votes_by_key: std::collections::HashMap<String, Vec<Vote>> =
			std::collections::HashMap::new();
		for row in &vote_rows {
			let key: String = row.try_get("ballot_key").map_err(db_err)?;
			votes_by_key.entry(key).or_default().push(Vote {
				person_id: PId(row.try_get("person_id").map_err(db_err)?),
				percent: row.try_get("percent").map_err(db_err)?,
			});
		}

		ballot_rows
			.iter()
			.map(|row| {
				let ballot = map_ballot(row)?;
				let votes = votes_by_key.remove(ballot.ballot_key.as_ref()).unwrap_or_default();
				Ok((ballot, votes))
			})
			.collect()
	}
}

// vim: ts=4
