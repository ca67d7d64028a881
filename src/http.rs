//! HTTP request and response types used by views and the server.

mod request;
mod response;

use hyper::Method;

pub use request::{Request, RequestBuilder};
pub use response::Response;

use crate::exception::{Error, Result};

/// Result type returned by every view.
pub type ViewResult<T> = crate::Result<T>;

/// Reject the request unless its method is one of `allowed`.
///
/// # Examples
///
/// ```
/// use hyper::Method;
/// use polls::http::{Request, require_http_methods};
///
/// let request = Request::builder().method(Method::DELETE).build().unwrap();
/// assert!(require_http_methods(&request, &[Method::GET]).is_err());
/// ```
pub fn require_http_methods(request: &Request, allowed: &[Method]) -> Result<()> {
	if allowed.contains(&request.method) {
		return Ok(());
	}
	Err(Error::MethodNotAllowed {
		method: request.method.to_string(),
		allowed: allowed.iter().map(Method::to_string).collect(),
	})
}
