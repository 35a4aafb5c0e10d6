//! Payout calculator
//!
//! Turns aggregated percentages into a proportional monetary split. Shares
//! keep full `f64` precision; rounding to two decimals happens only at the
//! presentation boundary, and independently rounded amounts are not
//! guaranteed to sum to exactly the input total. That drift (a cent or two)
//! is accepted; no largest-remainder correction is applied.

use serde::Serialize;

use crate::prelude::*;
use crate::results::ParticipantResult;

/// One participant's share of the payout
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutShare {
	pub name: Box<str>,
	/// Normalized share of the pot, in percent
	pub percent: f64,
	/// Unrounded monetary amount
	pub amount: f64,
}

/// Compute the proportional split of `total_amount` over the results
///
/// `share(p) = averagePercent(p) / Σ averagePercent`. Fails when nobody
/// rated anybody (an all-zero result set has no proportions to follow).
pub fn compute_payout(results: &[ParticipantResult], total_amount: f64) -> SvResult<Vec<PayoutShare>> {
	if !total_amount.is_finite() || total_amount <= 0.0 {
		return Err(Error::ValidationError(format!(
			"total amount must be positive, was {}",
			total_amount
		)));
	}

	let sum: f64 = results.iter().map(|r| r.average_percent).sum();
	if sum <= 0.0 {
		return Err(Error::ValidationError(
			"cannot compute payout: all aggregated percentages are zero".into(),
		));
	}

	Ok(results
		.iter()
		.map(|r| {
			let share = r.average_percent / sum;
			PayoutShare {
				name: r.name.clone(),
				percent: share * 100.0,
				amount: share * total_amount,
			}
		})
		.collect())
}

/// Round a monetary amount to two decimals for display
pub fn round_amount(amount: f64) -> f64 {
	(amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
	use super::*;

	fn result(name: &str, average_percent: f64) -> ParticipantResult {
		ParticipantResult {
			participant_id: PId(0),
			name: name.into(),
			average_percent,
			vote_count: 1,
			voters: None,
		}
	}

	#[test]
	fn test_proportional_split() {
		let results = vec![result("X", 75.0), result("Y", 25.0)];
		let shares = compute_payout(&results, 1000.0).unwrap();

		assert_eq!(round_amount(shares[0].amount), 750.0);
		assert_eq!(round_amount(shares[1].amount), 250.0);
		assert_eq!(shares[0].percent, 75.0);
	}

	#[test]
	fn test_shares_normalized_when_sum_below_100() {
		// Averages need not sum to 100 when participation is uneven
		let results = vec![result("X", 30.0), result("Y", 30.0)];
		let shares = compute_payout(&results, 100.0).unwrap();

		assert_eq!(round_amount(shares[0].amount), 50.0);
		assert_eq!(shares[0].percent, 50.0);
	}

	#[test]
	fn test_rounded_amounts_may_miss_the_total() {
		// Accepted behavior: independent rounding, no remainder distribution
		let results = vec![result("X", 1.0), result("Y", 1.0), result("Z", 1.0)];
		let shares = compute_payout(&results, 100.0).unwrap();

		let rounded_total: f64 = shares.iter().map(|s| round_amount(s.amount)).sum();
		assert!((rounded_total - 100.0).abs() < 0.02);
		assert_ne!(rounded_total, 100.0);

		// Full precision still sums to the total
		let exact_total: f64 = shares.iter().map(|s| s.amount).sum();
		assert!((exact_total - 100.0).abs() < 1e-9);
	}

	#[test]
	fn test_all_zero_results_rejected() {
		let results = vec![result("X", 0.0), result("Y", 0.0)];
		let res = compute_payout(&results, 1000.0);
		assert!(matches!(res, Err(Error::ValidationError(_))));
	}

	#[test]
	fn test_non_positive_amount_rejected() {
		let results = vec![result("X", 50.0)];
		assert!(compute_payout(&results, 0.0).is_err());
		assert!(compute_payout(&results, -10.0).is_err());
		assert!(compute_payout(&results, f64::NAN).is_err());
	}
}

// vim: ts=4
