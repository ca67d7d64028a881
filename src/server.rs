//! HTTP/1 server on hyper.
//!
//! Every connection is served on its own task. On shutdown the listener
//! stops accepting and in-flight connections get [`SHUTDOWN_GRACE_PERIOD`]
//! to finish.

mod handler;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::exception::{Error, Result};
use crate::http::{Request, Response};

pub use handler::{Handler, ProjectHandler};

/// How long in-flight connections may run after shutdown starts.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Default maximum request body size (10 MB)
pub const DEFAULT_MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

pub struct HttpServer {
	handler: Arc<dyn Handler>,
	max_body_size: u64,
}

impl HttpServer {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			handler,
			max_body_size: DEFAULT_MAX_BODY_SIZE,
		}
	}

	/// Answer 413 to requests whose body is larger than `max_body_size` bytes.
	pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
		self.max_body_size = max_body_size;
		self
	}

	/// Serve on `addr` until Ctrl-C.
	pub async fn listen(self, addr: SocketAddr) -> Result<()> {
		let listener = TcpListener::bind(addr).await?;
		self.serve(listener, shutdown_signal()).await
	}

	/// Serve connections from `listener` until `shutdown` resolves.
	pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
	where
		F: Future<Output = ()> + Send,
	{
		let local_addr = listener.local_addr()?;
		info!(address = %local_addr, "Server listening on http://{}", local_addr);

		let graceful = GracefulShutdown::new();
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				result = listener.accept() => {
					let (stream, remote_addr) = match result {
						Ok(accepted) => accepted,
						Err(err) => {
							warn!(error = %err, "Failed to accept connection");
							continue;
						}
					};
					let service = RequestService {
						handler: Arc::clone(&self.handler),
						remote_addr,
						max_body_size: self.max_body_size,
					};
					let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
					let connection = graceful.watch(connection);

					tokio::spawn(async move {
						if let Err(err) = connection.await {
							error!(remote_addr = %remote_addr, error = %err, "Error handling connection");
						}
					});
				}
				_ = &mut shutdown => {
					info!("Shutdown signal received, stopping server");
					break;
				}
			}
		}

		drop(listener);
		tokio::select! {
			_ = graceful.shutdown() => info!("All connections closed"),
			_ = tokio::time::sleep(SHUTDOWN_GRACE_PERIOD) => {
				warn!("Grace period elapsed with connections still open");
			}
		}
		Ok(())
	}
}

/// Adapts a [`Handler`] to hyper.
struct RequestService {
	handler: Arc<dyn Handler>,
	remote_addr: SocketAddr,
	max_body_size: u64,
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = Box<dyn std::error::Error + Send + Sync>;
	type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send + 'static>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let handler = Arc::clone(&self.handler);
		let remote_addr = self.remote_addr;
		let max_body_size = self.max_body_size;

		Box::pin(async move {
			// Reject before reading when the declared length is already too big
			if let Some(content_length) = req.headers().get(hyper::header::CONTENT_LENGTH)
				&& let Ok(len_str) = content_length.to_str()
				&& let Ok(len) = len_str.parse::<u64>()
				&& len > max_body_size
			{
				warn!(remote_addr = %remote_addr, content_length = len, "Request body too large");
				return Ok(payload_too_large(max_body_size));
			}

			let (parts, body) = req.into_parts();
			let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
			let body = match Limited::new(body, limit).collect().await {
				Ok(collected) => collected.to_bytes(),
				Err(err) if err.is::<LengthLimitError>() => {
					warn!(remote_addr = %remote_addr, "Request body exceeded limit while reading");
					return Ok(payload_too_large(max_body_size));
				}
				Err(err) => return Err(err),
			};

			let mut request = Request::new(parts.method, parts.uri, parts.version, parts.headers, body);
			request.remote_addr = Some(remote_addr);

			Ok(handler.respond(request).await.into_hyper())
		})
	}
}

fn payload_too_large(limit: u64) -> hyper::Response<Full<Bytes>> {
	Response::from(Error::PayloadTooLarge { limit }).into_hyper()
}

/// Resolves on Ctrl-C, or on SIGTERM on Unix.
pub async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			error!(error = %err, "Failed to listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(err) => {
				error!(error = %err, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
