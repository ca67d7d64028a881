use bytes::Bytes;
use hyper::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::http::Response;

/// Response seen by the test client.
#[derive(Debug, Clone)]
pub struct TestResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Bytes,
	context: Option<Value>,
	template_name: Option<String>,
}

impl From<Response> for TestResponse {
	fn from(response: Response) -> Self {
		Self {
			status: response.status,
			headers: response.headers,
			body: response.body,
			context: response.context,
			template_name: response.template_name,
		}
	}
}

impl TestResponse {
	pub fn status(&self) -> StatusCode {
		self.status
	}

	pub fn status_code(&self) -> u16 {
		self.status.as_u16()
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn body(&self) -> &Bytes {
		&self.body
	}

	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// `Location` header of a redirect.
	pub fn location(&self) -> Option<&str> {
		self.header("location")
	}

	/// Template context, when the response was rendered from a template.
	pub fn context(&self) -> Option<&Value> {
		self.context.as_ref()
	}

	/// A single context variable.
	///
	/// # Panics
	///
	/// Panics if the response has no context or lacks `key`.
	pub fn context_value(&self, key: &str) -> &Value {
		let context = self
			.context
			.as_ref()
			.unwrap_or_else(|| panic!("Response was not rendered from a template"));
		context
			.get(key)
			.unwrap_or_else(|| panic!("Context has no variable '{}': {}", key, context))
	}

	pub fn template_name(&self) -> Option<&str> {
		self.template_name.as_deref()
	}
}
