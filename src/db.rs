//! Database access: connection handling, a small Django-style query layer
//! and schema migrations.
//!
//! Everything runs on SQLite through `sqlx`. Foreign keys are switched on
//! for every connection so `ON DELETE CASCADE` is honoured.

pub mod manager;
pub mod migrations;
pub mod query;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::debug;

use crate::exception::Result;

pub use manager::Manager;
pub use query::{Filter, FilterOperator, FilterValue, QuerySet};

/// URL of a private in-memory database.
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Handle to the connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
	pool: SqlitePool,
}

impl Database {
	/// Connect to the database at `url`, creating the file if needed.
	///
	/// In-memory URLs are routed to [`Database::in_memory`] so the data
	/// survives across pooled connections.
	pub async fn connect(url: &str) -> Result<Self> {
		if url == IN_MEMORY_URL || url.contains(":memory:") {
			return Self::in_memory().await;
		}

		let options = SqliteConnectOptions::from_str(url)?
			.create_if_missing(true)
			.foreign_keys(true);
		let pool = SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(options)
			.await?;

		debug!(url, "Connected to database");
		Ok(Self { pool })
	}

	/// Open a fresh in-memory database.
	///
	/// Each in-memory SQLite connection is its own database, so the pool is
	/// pinned to a single connection that is never recycled.
	pub async fn in_memory() -> Result<Self> {
		let options = SqliteConnectOptions::from_str(IN_MEMORY_URL)?.foreign_keys(true);
		let pool = SqlitePoolOptions::new()
			.min_connections(1)
			.max_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
			.connect_with(options)
			.await?;

		debug!("Opened in-memory database");
		Ok(Self { pool })
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub async fn close(&self) {
		self.pool.close().await;
	}
}

/// A table-backed record.
///
/// Implementors list their columns so the query layer can reject unknown
/// field names before any SQL is built.
pub trait Model: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
	/// Table the model is stored in.
	fn table_name() -> &'static str;

	/// Column names, primary key included.
	fn columns() -> &'static [&'static str];

	/// Human-readable model name used in error messages.
	fn verbose_name() -> &'static str;

	fn primary_key_field() -> &'static str {
		"id"
	}

	/// Primary key, `None` while unsaved.
	fn primary_key(&self) -> Option<i64>;

	/// Manager for this model.
	fn objects(db: &Database) -> Manager<Self>
	where
		Self: Sized,
	{
		Manager::new(db.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_in_memory_enables_foreign_keys() {
		let db = Database::in_memory().await.unwrap();

		let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
			.fetch_one(db.pool())
			.await
			.unwrap();
		assert_eq!(enabled, 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_in_memory_keeps_data_between_queries() {
		let db = Database::connect(IN_MEMORY_URL).await.unwrap();

		sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
			.execute(db.pool())
			.await
			.unwrap();
		sqlx::query("INSERT INTO t (id) VALUES (1)")
			.execute(db.pool())
			.await
			.unwrap();

		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
			.fetch_one(db.pool())
			.await
			.unwrap();
		assert_eq!(count, 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_connect_creates_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("polls.sqlite3");
		let url = format!("sqlite://{}", path.display());

		let db = Database::connect(&url).await.unwrap();
		db.close().await;

		assert!(path.exists());
	}
}
