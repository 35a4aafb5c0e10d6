//! Error taxonomy shared by the whole engine.
//!
//! Validation failures are recoverable by the caller and carry the concrete
//! offending value in their message, so clients can guide correction.
//! Persistence failures are opaque to clients and logged server side.

use axum::{Json, http::StatusCode, response::IntoResponse};
use tracing::warn;

pub type SvResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Token, session or participant does not resolve
	NotFound,
	/// Organizer token mismatch, or a write against a closed session
	PermissionDenied,
	/// Caller-correctable input problem (message carries the offending value)
	ValidationError(String),
	/// Redundant state transition or unique-key violation
	Conflict(String),
	/// Too many attempts within the configured window
	RateLimited {
		/// Seconds until the window resets
		retry_after_secs: u64,
	},
	/// Persistence layer failure
	DbError(String),
	/// Invariant violation or configuration problem
	Internal(String),
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::NotFound => write!(f, "not found"),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::Conflict(msg) => write!(f, "conflict: {}", msg),
			Error::RateLimited { retry_after_secs } => {
				write!(f, "rate limited, retry after {}s", retry_after_secs)
			}
			Error::DbError(msg) => write!(f, "database error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

fn error_body(code: &str, message: &str) -> Json<serde_json::Value> {
	Json(serde_json::json!({
		"error": {
			"code": code,
			"message": message,
		}
	}))
}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		match self {
			Error::NotFound => {
				(StatusCode::NOT_FOUND, error_body("E-NOT-FOUND", "not found")).into_response()
			}
			Error::PermissionDenied => (
				StatusCode::FORBIDDEN,
				error_body("E-PERMISSION", "permission denied"),
			)
				.into_response(),
			Error::ValidationError(msg) => {
				(StatusCode::BAD_REQUEST, error_body("E-VALIDATION", &msg)).into_response()
			}
			Error::Conflict(msg) => {
				(StatusCode::CONFLICT, error_body("E-CONFLICT", &msg)).into_response()
			}
			Error::RateLimited { retry_after_secs } => {
				let body = Json(serde_json::json!({
					"error": {
						"code": "E-RATE-LIMITED",
						"message": "Too many requests. Please slow down.",
						"details": { "retryAfter": retry_after_secs }
					}
				}));
				let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
				if let Ok(val) = retry_after_secs.to_string().parse() {
					response.headers_mut().insert("Retry-After", val);
				}
				response
			}
			Error::DbError(msg) => {
				warn!("DB: {}", msg);
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					error_body("E-INTERNAL", "internal server error"),
				)
					.into_response()
			}
			Error::Internal(msg) => {
				warn!("internal: {}", msg);
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					error_body("E-INTERNAL", "internal server error"),
				)
					.into_response()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_carries_offending_value() {
		let err = Error::ValidationError("sum was 97.3%, must be 100%".into());
		assert_eq!(err.to_string(), "validation error: sum was 97.3%, must be 100%");
	}

	#[test]
	fn test_status_codes() {
		assert_eq!(Error::NotFound.into_response().status(), StatusCode::NOT_FOUND);
		assert_eq!(Error::PermissionDenied.into_response().status(), StatusCode::FORBIDDEN);
		assert_eq!(
			Error::ValidationError("x".into()).into_response().status(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(Error::Conflict("x".into()).into_response().status(), StatusCode::CONFLICT);
		assert_eq!(
			Error::DbError("x".into()).into_response().status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}
}

// vim: ts=4
