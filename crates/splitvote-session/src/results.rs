//! Results aggregator
//!
//! Computes each participant's mean received allocation across all
//! submitted ballots. The mean is taken over the voters who actually rated
//! a given participant; a voter who omitted someone does not drag that
//! average toward zero. With uneven participation this skews results
//! compared to a mean over all voters, and that is the intended behavior.

use std::collections::HashMap;

use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::prelude::*;
use splitvote_types::vote_adapter::{Ballot, Participant, Vote};

/// Aggregated outcome for one participant
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResult {
	pub participant_id: PId,
	pub name: Box<str>,
	pub average_percent: f64,
	pub vote_count: u32,
	/// Display names of the voters who rated this participant; withheld
	/// entirely for anonymous sessions
	pub voters: Option<Vec<Box<str>>>,
}

/// Aggregate submitted ballots into per-participant results
///
/// Results come back in participant insertion order; leaderboard sorting is
/// the caller's concern. For anonymous sessions no voter identity of any
/// kind appears in the output.
pub fn aggregate(
	participants: &[Participant],
	ballots: &[(Ballot, Vec<Vote>)],
	anonymous: bool,
) -> Vec<ParticipantResult> {
	let voter_names: HashMap<PId, &str> =
		participants.iter().map(|p| (p.participant_id, p.name.as_ref())).collect();

	struct Acc<'a> {
		total_percent: f64,
		vote_count: u32,
		voters: Vec<&'a str>,
	}

	let mut accs: HashMap<PId, Acc<'_>> = participants
		.iter()
		.map(|p| {
			(p.participant_id, Acc { total_percent: 0.0, vote_count: 0, voters: Vec::new() })
		})
		.collect();

	for (ballot, votes) in ballots {
		let voter_name = voter_names.get(&ballot.participant_id).copied();
		for vote in votes {
			// Attribute only to known participants of this session
			let Some(acc) = accs.get_mut(&vote.person_id) else { continue };
			acc.total_percent += vote.percent;
			acc.vote_count += 1;
			if let Some(name) = voter_name {
				acc.voters.push(name);
			}
		}
	}

	participants
		.iter()
		.map(|p| {
			let acc = &accs[&p.participant_id];
			let average_percent = if acc.vote_count > 0 {
				acc.total_percent / f64::from(acc.vote_count)
			} else {
				0.0
			};
			ParticipantResult {
				participant_id: p.participant_id,
				name: p.name.clone(),
				average_percent,
				vote_count: acc.vote_count,
				voters: if anonymous {
					None
				} else {
					Some(acc.voters.iter().map(|&v| Box::from(v)).collect())
				},
			}
		})
		.collect()
}


// vim: ts=4
