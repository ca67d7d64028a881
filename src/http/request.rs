use bytes::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{HeaderMap, Method, Uri, Version};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::exception::{Error, Result};

/// HTTP request as seen by views.
///
/// The body is fully buffered; path parameters are filled in by the URL
/// resolver once a pattern matches.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	pub path_params: HashMap<String, String>,
	pub query_params: HashMap<String, String>,
	pub remote_addr: Option<SocketAddr>,
}

impl Request {
	/// Create a request from its raw parts.
	pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> Self {
		let query_params = Self::parse_query_params(&uri);
		Self {
			method,
			uri,
			version,
			headers,
			body,
			path_params: HashMap::new(),
			query_params,
			remote_addr: None,
		}
	}

	/// Start building a request.
	///
	/// # Examples
	///
	/// ```
	/// use polls::http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::GET)
	///     .uri("/polls/?page=2")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.path(), "/polls/");
	/// assert_eq!(request.query_params.get("page"), Some(&"2".to_string()));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	fn parse_query_params(uri: &Uri) -> HashMap<String, String> {
		uri.query()
			.map(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).unwrap_or_default())
			.unwrap_or_default()
			.into_iter()
			.collect()
	}

	/// Request path without the query string.
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Set a path parameter (used by the URL resolver).
	pub fn set_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.path_params.insert(key.into(), value.into());
	}

	/// Parse a captured path parameter.
	///
	/// A missing parameter is a server-side wiring error; a value that does
	/// not parse is reported as not found, since no object can match it.
	pub fn path_param<T: FromStr>(&self, name: &str) -> Result<T> {
		let raw = self
			.path_params
			.get(name)
			.ok_or_else(|| Error::Internal(format!("Missing path parameter '{}'", name)))?;
		raw.parse()
			.map_err(|_| Error::NotFound(format!("Invalid value for '{}': {}", name, raw)))
	}

	/// Header value as a string, if present and valid UTF-8.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Decode an `application/x-www-form-urlencoded` body.
	pub fn form<T: DeserializeOwned>(&self) -> Result<T> {
		if let Some(content_type) = self.header(CONTENT_TYPE.as_str())
			&& !content_type.starts_with("application/x-www-form-urlencoded")
		{
			return Err(Error::BadRequest(format!(
				"Unsupported content type: {}",
				content_type
			)));
		}
		serde_urlencoded::from_bytes(&self.body).map_err(|e| Error::BadRequest(e.to_string()))
	}
}

/// Builder for [`Request`], mostly used by tests and the test client.
#[derive(Debug)]
pub struct RequestBuilder {
	method: Method,
	uri: String,
	version: Version,
	headers: HeaderMap,
	body: Bytes,
}

impl Default for RequestBuilder {
	fn default() -> Self {
		Self {
			method: Method::GET,
			uri: "/".to_string(),
			version: Version::HTTP_11,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = uri.into();
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	pub fn header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			hyper::header::HeaderName::from_bytes(name.as_bytes()),
			hyper::header::HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn build(self) -> Result<Request> {
		let uri = Uri::from_str(&self.uri)
			.map_err(|e| Error::BadRequest(format!("Invalid URI '{}': {}", self.uri, e)))?;
		Ok(Request::new(
			self.method,
			uri,
			self.version,
			self.headers,
			self.body,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde::Deserialize;

	#[derive(Debug, Deserialize)]
	struct VotePayload {
		choice: Option<String>,
	}

	#[rstest]
	fn test_query_params_are_decoded() {
		let request = Request::builder()
			.uri("/polls/?q=what%27s+up")
			.build()
			.unwrap();

		assert_eq!(request.query_params.get("q"), Some(&"what's up".to_string()));
	}

	#[rstest]
	fn test_path_param_parses() {
		let mut request = Request::builder().uri("/polls/3/").build().unwrap();
		request.set_path_param("question_id", "3");

		let id: i64 = request.path_param("question_id").unwrap();
		assert_eq!(id, 3);
	}

	#[rstest]
	fn test_path_param_unparsable_is_not_found() {
		let mut request = Request::builder().uri("/polls/x/").build().unwrap();
		request.set_path_param("question_id", "x");

		let result: Result<i64> = request.path_param("question_id");
		assert!(matches!(result, Err(Error::NotFound(_))));
	}

	#[rstest]
	fn test_form_body() {
		let request = Request::builder()
			.method(Method::POST)
			.header("content-type", "application/x-www-form-urlencoded")
			.body("choice=2")
			.build()
			.unwrap();

		let payload: VotePayload = request.form().unwrap();
		assert_eq!(payload.choice.as_deref(), Some("2"));
	}

	#[rstest]
	fn test_form_rejects_json_content_type() {
		let request = Request::builder()
			.method(Method::POST)
			.header("content-type", "application/json")
			.body("{\"choice\": 2}")
			.build()
			.unwrap();

		let result: Result<VotePayload> = request.form();
		assert!(matches!(result, Err(Error::BadRequest(_))));
	}
}
