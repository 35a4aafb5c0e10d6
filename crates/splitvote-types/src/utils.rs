//! Utility functions

use crate::prelude::*;
use rand::RngExt;

pub const TOKEN_LENGTH: usize = 32;
pub const SAFE: [char; 62] = [
	'0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
	'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
	'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
	'V', 'W', 'X', 'Y', 'Z',
];

/// Generate an opaque, high-entropy token over the url-safe alphabet.
///
/// Tokens are used directly as lookup keys (organizer and invite tokens), so
/// collision probability must be negligible; callers inserting one as a
/// natural key still retry on a unique violation.
pub fn random_token() -> SvResult<String> {
	let mut rng = rand::rng();
	let mut result = String::with_capacity(TOKEN_LENGTH);

	for _ in 0..TOKEN_LENGTH {
		result.push(SAFE[rng.random_range(0..SAFE.len())]);
	}
	Ok(result)
}


// vim: ts=4
