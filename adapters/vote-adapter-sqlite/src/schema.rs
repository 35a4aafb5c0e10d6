//! Database schema initialization
//!
//! Creates tables and the unique indexes the engine relies on: one per
//! organizer token, one per invite token, one per hashed ballot key, and one
//! ballot per participant.

use sqlx::SqlitePool;

/// Initialize the database schema with all required tables and indexes
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Sessions
	//**********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS sessions (
		sn_id integer PRIMARY KEY,
		title text NOT NULL,
		scheduled_at datetime,
		evaluation_info text,
		anonymous boolean NOT NULL DEFAULT 0,
		status char(1) NOT NULL DEFAULT 'O',
		organizer_token text NOT NULL,
		created_at datetime DEFAULT (unixepoch())
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_organizer_token
		ON sessions(organizer_token)",
	)
	.execute(&mut *tx)
	.await?;

	// Participants
	//**************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS participants (
		participant_id integer PRIMARY KEY,
		sn_id integer NOT NULL,
		name text NOT NULL,
		email text,
		invite_token text NOT NULL,
		submitted boolean NOT NULL DEFAULT 0,
		user_id text
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_participants_invite_token
		ON participants(invite_token)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_participants_snid ON participants(sn_id)")
		.execute(&mut *tx)
		.await?;

	// Ballots
	//*********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS ballots (
		ballot_key text NOT NULL,
		sn_id integer NOT NULL,
		participant_id integer NOT NULL,
		status char(1) NOT NULL DEFAULT 'S',
		submitted_at datetime,
		PRIMARY KEY(ballot_key)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_ballots_participant
		ON ballots(participant_id)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_ballots_snid ON ballots(sn_id)")
		.execute(&mut *tx)
		.await?;

	// Votes
	//*******
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS votes (
		ballot_key text NOT NULL,
		person_id integer NOT NULL,
		percent real NOT NULL,
		PRIMARY KEY(ballot_key, person_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(())
}

// vim: ts=4
