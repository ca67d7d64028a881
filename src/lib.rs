//! # Polls
//!
//! The classic poll application: questions with a publication date, choices
//! that collect votes, and a handful of pages to list, inspect, vote on and
//! review them.
//!
//! The crate is laid out like a Django project:
//!
//! - [`apps::polls`] holds the application itself (models, serializers, views, urls)
//! - [`config`] holds project wiring (settings and the root URL configuration)
//! - the remaining modules are the thin web layer the application runs on
//!   ([`http`], [`urls`], [`shortcuts`], [`templates`], [`db`], [`server`])
//!
//! ## Quick start
//!
//! ```bash
//! cargo run -- migrate
//! cargo run -- createquestion "What's up?"
//! cargo run -- runserver 127.0.0.1:8000
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use polls::apps::polls::models::Question;
//! use polls::db::Database;
//!
//! # async fn example() -> polls::Result<()> {
//! let db = Database::in_memory().await?;
//! polls::db::migrations::migrate(&db).await?;
//!
//! let question = Question::create(&db, "What's new?", chrono::Utc::now()).await?;
//! question.create_choice(&db, "Not much").await?;
//! assert!(question.was_published_recently());
//! # Ok(())
//! # }
//! ```

pub mod apps;
pub mod commands;
pub mod config;
pub mod db;
pub mod exception;
pub mod http;
pub mod logging;
pub mod server;
pub mod shortcuts;
pub mod state;
pub mod templates;
#[cfg(any(test, feature = "test-utils"))]
pub mod test;
pub mod urls;

pub use exception::{Error, Result};
pub use http::{Request, Response};
pub use state::AppState;
