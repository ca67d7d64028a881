use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::exception::{Error, Result};
use crate::http::{Request, Response};
use crate::state::AppState;
use crate::urls::{UrlResolver, root_urlconf};

/// Turns requests into responses.
#[async_trait]
pub trait Handler: Send + Sync {
	async fn handle(&self, request: Request) -> Result<Response>;

	/// Handle `request`, converting errors into responses and logging the
	/// outcome. Server errors are logged in full; their bodies stay generic.
	async fn respond(&self, request: Request) -> Response {
		let method = request.method.clone();
		let path = request.path().to_string();
		let started = Instant::now();

		let response = match self.handle(request).await {
			Ok(response) => response,
			Err(err) => {
				if err.is_server_error() {
					error!(method = %method, path = %path, error = %err, "Request failed");
				} else {
					debug!(method = %method, path = %path, error = %err, "Request rejected");
				}
				Response::from(err)
			}
		};

		info!(
			method = %method,
			path = %path,
			status = response.status.as_u16(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"Request handled"
		);
		response
	}
}

/// Dispatches requests through the project URL configuration.
#[derive(Debug, Clone)]
pub struct ProjectHandler {
	state: AppState,
	urls: &'static UrlResolver,
}

impl ProjectHandler {
	pub fn new(state: AppState) -> Self {
		Self::with_urls(state, root_urlconf())
	}

	pub fn with_urls(state: AppState, urls: &'static UrlResolver) -> Self {
		Self { state, urls }
	}

	pub fn state(&self) -> &AppState {
		&self.state
	}

	/// `/path` to `/path/` redirect target, when appending the slash makes
	/// the path resolve.
	fn slash_redirect(&self, request: &Request) -> Option<String> {
		let path = request.path();
		if !self.state.settings.append_slash || path.ends_with('/') {
			return None;
		}
		let with_slash = format!("{}/", path);
		self.urls.resolve(&with_slash)?;

		Some(match request.uri.query() {
			Some(query) => format!("{}?{}", with_slash, query),
			None => with_slash,
		})
	}
}

#[async_trait]
impl Handler for ProjectHandler {
	async fn handle(&self, mut request: Request) -> Result<Response> {
		let Some(matched) = self.urls.resolve(request.path()) else {
			if let Some(location) = self.slash_redirect(&request) {
				return Ok(Response::permanent_redirect(location));
			}
			return Err(Error::NotFound(format!(
				"The current path, {}, didn't match any of these.",
				request.path()
			)));
		};

		for (key, value) in matched.kwargs {
			request.set_path_param(key, value);
		}
		(matched.view)(request, self.state.clone()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test::fixtures;
	use hyper::{Method, StatusCode};
	use rstest::rstest;

	async fn handler(append_slash: bool) -> ProjectHandler {
		let mut settings = fixtures::test_settings();
		settings.append_slash = append_slash;
		let state = AppState::new(fixtures::database().await, settings);
		ProjectHandler::new(state)
	}

	fn get(uri: &str) -> Request {
		Request::builder().method(Method::GET).uri(uri).build().unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_append_slash_redirects_with_query() {
		let handler = handler(true).await;
		let response = handler.respond(get("/polls?page=2")).await;

		assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
		assert_eq!(response.headers.get("location").unwrap(), "/polls/?page=2");
	}

	#[rstest]
	#[tokio::test]
	async fn test_append_slash_disabled() {
		let handler = handler(false).await;
		let response = handler.respond(get("/polls")).await;
		assert_eq!(response.status, StatusCode::NOT_FOUND);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unknown_path_is_not_found() {
		let handler = handler(true).await;
		let response = handler.respond(get("/nothing/here")).await;

		assert_eq!(response.status, StatusCode::NOT_FOUND);
		assert_eq!(response.text(), "Not Found");
	}

	#[rstest]
	#[tokio::test]
	async fn test_wrong_method_is_405() {
		let handler = handler(true).await;
		let request = Request::builder().method(Method::DELETE).uri("/polls/").build().unwrap();
		let response = handler.respond(request).await;

		assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
		assert_eq!(response.headers.get("allow").unwrap(), "GET, HEAD");
	}
}
