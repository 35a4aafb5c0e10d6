//! One-way hashing of invite tokens into ballot storage keys.
//!
//! Ballots are content-addressed: `ballot_key = "b1~" + SHA256(invite token)`.
//! The raw token is never persisted as a dereferenceable foreign key, so a
//! leaked ballot table does not yield submission credentials.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

pub const BALLOT_KEY_PREFIX: &str = "b1~";

/// Derive the storage key of the ballot owned by `invite_token`.
///
/// Deterministic, so "does this token have a ballot" is answerable by
/// rehashing; one-way, so the reverse lookup is not.
pub fn ballot_key(invite_token: &str) -> String {
	let digest = Sha256::digest(invite_token.as_bytes());
	format!("{}{}", BALLOT_KEY_PREFIX, URL_SAFE_NO_PAD.encode(digest))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_deterministic() {
		assert_eq!(ballot_key("tok-1"), ballot_key("tok-1"));
	}

	#[test]
	fn test_distinct_tokens_distinct_keys() {
		assert_ne!(ballot_key("tok-1"), ballot_key("tok-2"));
	}

	#[test]
	fn test_key_shape() {
		let key = ballot_key("some-invite-token");
		assert!(key.starts_with(BALLOT_KEY_PREFIX));
		// SHA-256 is 32 bytes, 43 chars in unpadded base64url
		assert_eq!(key.len(), BALLOT_KEY_PREFIX.len() + 43);
		assert!(!key.contains("some-invite-token"));
	}
}

// vim: ts=4
