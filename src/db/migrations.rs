//! Schema migrations.
//!
//! Each application contributes an ordered list of [`Migration`]s. Applied
//! migrations are recorded in `schema_migrations`, so running [`migrate`]
//! again only applies what is new. Every migration runs in its own
//! transaction together with its bookkeeping row.

use chrono::Utc;
use sea_query::{Alias, ColumnDef, Index, SqliteQueryBuilder, Table};
use std::collections::HashSet;
use tracing::info;

use super::Database;
use crate::exception::Result;

/// A named, ordered schema change belonging to one application.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
	pub app_label: &'static str,
	pub name: &'static str,
	/// Produces the SQL statements to run, in order.
	pub up: fn() -> Vec<String>,
}

impl Migration {
	/// `app_label.name`, as shown by `showmigrations`.
	pub fn id(&self) -> String {
		format!("{}.{}", self.app_label, self.name)
	}
}

/// Whether a known migration has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
	pub app_label: String,
	pub name: String,
	pub applied: bool,
}

fn recorder_table_sql() -> String {
	Table::create()
		.table(Alias::new("schema_migrations"))
		.if_not_exists()
		.col(ColumnDef::new(Alias::new("app")).string_len(255).not_null())
		.col(ColumnDef::new(Alias::new("name")).string_len(255).not_null())
		.col(
			ColumnDef::new(Alias::new("applied"))
				.timestamp_with_time_zone()
				.not_null(),
		)
		.primary_key(
			Index::create()
				.col(Alias::new("app"))
				.col(Alias::new("name")),
		)
		.to_owned()
		.to_string(SqliteQueryBuilder)
}

async fn ensure_recorder(db: &Database) -> Result<()> {
	sqlx::query(&recorder_table_sql())
		.execute(db.pool())
		.await?;
	Ok(())
}

async fn applied_set(db: &Database) -> Result<HashSet<(String, String)>> {
	ensure_recorder(db).await?;
	let rows: Vec<(String, String)> = sqlx::query_as("SELECT app, name FROM schema_migrations")
		.fetch_all(db.pool())
		.await?;
	Ok(rows.into_iter().collect())
}

/// Every migration known to the project, in application order.
pub fn all_migrations() -> Vec<Migration> {
	crate::apps::migrations()
}

/// Migrations from `migrations` that have not been applied yet.
pub async fn plan_for(db: &Database, migrations: &[Migration]) -> Result<Vec<Migration>> {
	let applied = applied_set(db).await?;
	Ok(migrations
		.iter()
		.filter(|m| !applied.contains(&(m.app_label.to_string(), m.name.to_string())))
		.copied()
		.collect())
}

/// Apply the pending subset of `migrations`, returning what was applied.
pub async fn apply(db: &Database, migrations: &[Migration]) -> Result<Vec<Migration>> {
	let pending = plan_for(db, migrations).await?;

	for migration in &pending {
		let mut tx = db.pool().begin().await?;
		for statement in (migration.up)() {
			sqlx::query(&statement).execute(&mut *tx).await?;
		}
		sqlx::query("INSERT INTO schema_migrations (app, name, applied) VALUES (?, ?, ?)")
			.bind(migration.app_label)
			.bind(migration.name)
			.bind(Utc::now())
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;

		info!(migration = %migration.id(), "Applied migration");
	}

	Ok(pending)
}

/// Apply every pending project migration.
pub async fn migrate(db: &Database) -> Result<Vec<Migration>> {
	apply(db, &all_migrations()).await
}

/// Pending project migrations, without applying them.
pub async fn plan(db: &Database) -> Result<Vec<Migration>> {
	plan_for(db, &all_migrations()).await
}

/// Status of every project migration.
pub async fn show_migrations(db: &Database) -> Result<Vec<MigrationStatus>> {
	let applied = applied_set(db).await?;
	Ok(all_migrations()
		.into_iter()
		.map(|m| MigrationStatus {
			app_label: m.app_label.to_string(),
			name: m.name.to_string(),
			applied: applied.contains(&(m.app_label.to_string(), m.name.to_string())),
		})
		.collect())
}
