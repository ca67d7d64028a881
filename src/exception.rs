//! Error types shared by every layer of the application.
//!
//! A single [`Error`] enum travels from the query layer up through the views;
//! the HTTP layer turns it into a response with [`Error::status_code`].

use hyper::StatusCode;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Application errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// Requested object or route does not exist.
	#[error("Not found: {0}")]
	NotFound(String),

	/// A lookup expected exactly one row but found several.
	#[error("Multiple objects returned: {0}")]
	MultipleObjectsReturned(String),

	/// Field-level validation failure.
	#[error("Validation error: {0}")]
	Validation(String),

	/// The route exists but not for this HTTP method.
	#[error("Method not allowed: {method}")]
	MethodNotAllowed {
		/// Method that was used.
		method: String,
		/// Methods the route accepts.
		allowed: Vec<String>,
	},

	/// Malformed request (bad form body, unparsable path parameter, ...).
	#[error("Bad request: {0}")]
	BadRequest(String),

	/// Request body is larger than the server accepts.
	#[error("Request body exceeds {limit} bytes")]
	PayloadTooLarge {
		/// Configured limit in bytes.
		limit: u64,
	},

	/// `reverse()` could not build a URL.
	#[error("No reverse match: {0}")]
	NoReverseMatch(String),

	/// Query referenced a field the model does not declare.
	#[error("Invalid field '{field}' for table '{table}'")]
	InvalidField {
		/// Offending field name.
		field: String,
		/// Table the query targeted.
		table: &'static str,
	},

	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("Template error: {0}")]
	Template(#[from] tera::Error),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// HTTP status this error should be reported with.
	///
	/// # Examples
	///
	/// ```
	/// use polls::Error;
	/// use hyper::StatusCode;
	///
	/// assert_eq!(Error::NotFound("question 7".into()).status_code(), StatusCode::NOT_FOUND);
	/// assert_eq!(Error::Validation("too long".into()).status_code(), StatusCode::BAD_REQUEST);
	/// ```
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::NotFound(_) => StatusCode::NOT_FOUND,
			Error::Validation(_) | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
			Error::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
			Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
			Error::MultipleObjectsReturned(_)
			| Error::NoReverseMatch(_)
			| Error::InvalidField { .. }
			| Error::Database(_)
			| Error::Template(_)
			| Error::Serialization(_)
			| Error::Configuration(_)
			| Error::Io(_)
			| Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// True for errors caused by the server rather than the client.
	pub fn is_server_error(&self) -> bool {
		self.status_code().is_server_error()
	}
}

impl From<validator::ValidationErrors> for Error {
	fn from(errors: validator::ValidationErrors) -> Self {
		let mut messages: Vec<String> = errors
			.field_errors()
			.iter()
			.flat_map(|(field, errs)| {
				errs.iter().map(move |e| match &e.message {
					Some(message) => format!("{}: {}", field, message),
					None => format!("{}: {}", field, e.code),
				})
			})
			.collect();
		messages.sort();
		Error::Validation(messages.join("; "))
	}
}

impl From<crate::config::settings::SettingsError> for Error {
	fn from(error: crate::config::settings::SettingsError) -> Self {
		Error::Configuration(error.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Error::NotFound("x".into()), StatusCode::NOT_FOUND)]
	#[case(Error::Validation("x".into()), StatusCode::BAD_REQUEST)]
	#[case(Error::BadRequest("x".into()), StatusCode::BAD_REQUEST)]
	#[case(Error::MethodNotAllowed { method: "PUT".into(), allowed: vec!["GET".into()] }, StatusCode::METHOD_NOT_ALLOWED)]
	#[case(Error::PayloadTooLarge { limit: 16 }, StatusCode::PAYLOAD_TOO_LARGE)]
	#[case(Error::MultipleObjectsReturned("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
	#[case(Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
	#[case(Error::Database(sqlx::Error::RowNotFound), StatusCode::INTERNAL_SERVER_ERROR)]
	fn test_status_code_mapping(#[case] error: Error, #[case] expected: StatusCode) {
		assert_eq!(error.status_code(), expected);
	}

	#[rstest]
	fn test_not_found_message() {
		let error = Error::NotFound("Question matching query does not exist".to_string());
		assert_eq!(
			error.to_string(),
			"Not found: Question matching query does not exist"
		);
	}

	#[rstest]
	fn test_server_error_flag() {
		assert!(Error::Configuration("bad".into()).is_server_error());
		assert!(!Error::NotFound("gone".into()).is_server_error());
	}
}
