//! Token service
//!
//! Two token kinds live here. Opaque invite/organizer tokens are high-entropy
//! random strings used directly as lookup keys; the ballot storage key is a
//! one-way hash of the invite token, so ballots are never addressable by the
//! raw secret. Signed access tokens are short-lived HS256 JWTs granting
//! organizer read access without replaying the raw organizer token.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::prelude::*;
use splitvote_types::{hasher, utils};

/// Access token lifetime in seconds
pub const ACCESS_TOKEN_EXPIRY: i64 = 86_400;

/// Claims of a signed organizer access token
#[derive(Debug, Deserialize, Serialize)]
struct AccessClaims {
	/// Session id the token grants read access to
	sub: String,
	/// Expiry as a Unix timestamp
	exp: i64,
}

#[derive(Debug)]
pub struct TokenService {
	secret: Box<str>,
}

impl TokenService {
	pub fn new(secret: impl Into<Box<str>>) -> Self {
		Self { secret: secret.into() }
	}

	/// Generate an opaque invite/organizer token
	pub fn generate_token(&self) -> SvResult<String> {
		utils::random_token()
	}

	/// Derive the ballot storage key for an invite token
	pub fn ballot_key(&self, invite_token: &str) -> String {
		hasher::ballot_key(invite_token)
	}

	/// Create a signed access token for a session, expiring after
	/// [`ACCESS_TOKEN_EXPIRY`] seconds
	pub fn create_access_token(&self, sn_id: SnId) -> SvResult<Box<str>> {
		self.create_access_token_until(sn_id, Timestamp::now().add_seconds(ACCESS_TOKEN_EXPIRY))
	}

	/// Create a signed access token with an explicit expiry
	pub fn create_access_token_until(&self, sn_id: SnId, expires_at: Timestamp) -> SvResult<Box<str>> {
		let claims = AccessClaims { sub: sn_id.0.to_string(), exp: expires_at.0 };
		let token = encode(
			&Header::new(Algorithm::HS256),
			&claims,
			&EncodingKey::from_secret(self.secret.as_bytes()),
		)
		.map_err(|_| Error::PermissionDenied)?;

		Ok(token.into())
	}

	/// Validate a signed access token and return the session it grants
	pub fn verify_access_token(&self, token: &str) -> SvResult<SnId> {
		let data = decode::<AccessClaims>(
			token,
			&DecodingKey::from_secret(self.secret.as_bytes()),
			&Validation::new(Algorithm::HS256),
		)
		.map_err(|_| Error::PermissionDenied)?;

		let sn_id = data.claims.sub.parse().map_err(|_| Error::PermissionDenied)?;
		Ok(SnId(sn_id))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_access_token_roundtrip() {
		let tokens = TokenService::new("test-secret");
		let token = tokens.create_access_token(SnId(42)).unwrap();

		assert_eq!(tokens.verify_access_token(&token).unwrap(), SnId(42));
	}

	#[test]
	fn test_wrong_secret_rejected() {
		let tokens = TokenService::new("test-secret");
		let other = TokenService::new("other-secret");
		let token = tokens.create_access_token(SnId(42)).unwrap();

		assert!(other.verify_access_token(&token).is_err());
	}

	#[test]
	fn test_expired_token_rejected() {
		let tokens = TokenService::new("test-secret");
		let expired = Timestamp::now().add_seconds(-3600);
		let token = tokens.create_access_token_until(SnId(42), expired).unwrap();

		assert!(tokens.verify_access_token(&token).is_err());
	}

	#[test]
	fn test_tampered_token_rejected() {
		let tokens = TokenService::new("test-secret");
		let token = tokens.create_access_token(SnId(42)).unwrap();
		let tampered = format!("{}x", token);

		assert!(tokens.verify_access_token(&tampered).is_err());
	}
}

// vim: ts=4
