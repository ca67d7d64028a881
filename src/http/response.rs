use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderName, HeaderValue, LOCATION};
use hyper::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::exception::Error;

/// HTTP response produced by views.
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Template context the body was rendered from, kept for test inspection.
	pub context: Option<Value>,
	/// Name of the template that produced the body.
	pub template_name: Option<String>,
}

impl Response {
	/// Create a new Response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use polls::http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			context: None,
			template_name: None,
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// Create a Response with HTTP 301 Moved Permanently (permanent redirect)
	pub fn permanent_redirect(location: impl AsRef<str>) -> Self {
		Self::new(StatusCode::MOVED_PERMANENTLY).with_location(location.as_ref())
	}

	/// Create a Response with HTTP 302 Found (temporary redirect)
	///
	/// # Examples
	///
	/// ```
	/// use polls::http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::temporary_redirect("/polls/1/results/");
	/// assert_eq!(response.status, StatusCode::FOUND);
	/// assert_eq!(
	///     response.headers.get("location").unwrap().to_str().unwrap(),
	///     "/polls/1/results/"
	/// );
	/// ```
	pub fn temporary_redirect(location: impl AsRef<str>) -> Self {
		Self::new(StatusCode::FOUND).with_location(location.as_ref())
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Add a header; invalid names or values are ignored.
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn with_location(mut self, location: &str) -> Self {
		if let Ok(value) = HeaderValue::from_str(location) {
			self.headers.insert(LOCATION, value);
		}
		self
	}

	/// Set an HTML body with the matching content type.
	pub fn with_html(mut self, html: impl Into<String>) -> Self {
		self.body = Bytes::from(html.into());
		self.headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_static("text/html; charset=utf-8"),
		);
		self
	}

	/// Attach the context a template was rendered with.
	pub fn with_context(mut self, template_name: &str, context: Value) -> Self {
		self.template_name = Some(template_name.to_string());
		self.context = Some(context);
		self
	}

	/// Body as UTF-8 text (lossy).
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Convert into the hyper response written to the wire.
	pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
		let mut response = hyper::Response::new(Full::new(self.body));
		*response.status_mut() = self.status;
		*response.headers_mut() = self.headers;
		response
	}
}

impl From<Error> for Response {
	/// Client errors carry their message; server errors get a generic body so
	/// internals never reach the client.
	fn from(error: Error) -> Self {
		let status = error.status_code();
		let message = if status.is_server_error() {
			"Internal server error".to_string()
		} else {
			match &error {
				Error::NotFound(_) => "Not Found".to_string(),
				other => other.to_string(),
			}
		};

		let mut response = Response::new(status)
			.with_header("content-type", "text/plain; charset=utf-8")
			.with_body(message);

		if let Error::MethodNotAllowed { allowed, .. } = &error
			&& let Ok(value) = HeaderValue::from_str(&allowed.join(", "))
		{
			response.headers.insert(ALLOW, value);
		}
		response
	}
}
