//! Testing utilities: an in-process client, response wrapper, assertions
//! and database fixtures.
//!
//! Requests go straight to the [`ProjectHandler`](crate::server::ProjectHandler)
//! without opening a socket, and responses keep the template context they
//! were rendered with.
//!
//! Only built for this crate's own tests or with the `test-utils` feature.

mod response;

pub use assertions::{assert_contains, assert_not_contains, assert_redirects};
pub use client::Client;
pub use response::TestResponse;
