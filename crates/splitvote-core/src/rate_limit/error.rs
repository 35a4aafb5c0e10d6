//! Rate limiting error types

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub enum RateLimitError {
	/// Too many attempts for this action within the current window
	RateLimited {
		/// Which action triggered the limit
		action: &'static str,
		/// Time until the window resets
		retry_after: Duration,
	},
}

impl std::fmt::Display for RateLimitError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RateLimitError::RateLimited { action, retry_after } => {
				write!(f, "Rate limited on {}, retry after {:?}", action, retry_after)
			}
		}
	}
}

impl std::error::Error for RateLimitError {}

impl From<RateLimitError> for splitvote_types::error::Error {
	fn from(err: RateLimitError) -> Self {
		match err {
			RateLimitError::RateLimited { retry_after, .. } => {
				splitvote_types::error::Error::RateLimited {
					retry_after_secs: retry_after.as_secs_f64().ceil() as u64,
				}
			}
		}
	}
}

impl IntoResponse for RateLimitError {
	fn into_response(self) -> Response {
		match self {
			RateLimitError::RateLimited { action, retry_after } => {
				// Round up so "retry after 0s" never lies to the client
				let retry_secs = retry_after.as_secs_f64().ceil() as u64;
				let body = serde_json::json!({
					"error": {
						"code": "E-RATE-LIMITED",
						"message": "Too many requests. Please slow down.",
						"details": {
							"action": action,
							"retryAfter": retry_secs
						}
					}
				});

				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

				if let Ok(val) = retry_secs.to_string().parse() {
					response.headers_mut().insert("Retry-After", val);
				}

				response
			}
		}
	}
}

// vim: ts=4
