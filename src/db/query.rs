//! Lazily-built queries over a single model.
//!
//! A [`QuerySet`] collects filters, ordering and a limit, and only touches
//! the database when one of its async terminal methods runs. Field names are
//! checked against [`Model::columns`]; values always travel as bound
//! parameters.

use chrono::{DateTime, Utc};
use sqlx::Sqlite;
use std::fmt;
use std::marker::PhantomData;

use super::{Database, Model};
use crate::exception::{Error, Result};

/// Comparison used by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
	Eq,
	Ne,
	Lt,
	Lte,
	Gt,
	Gte,
}

impl FilterOperator {
	fn as_sql(self) -> &'static str {
		match self {
			FilterOperator::Eq => "=",
			FilterOperator::Ne => "<>",
			FilterOperator::Lt => "<",
			FilterOperator::Lte => "<=",
			FilterOperator::Gt => ">",
			FilterOperator::Gte => ">=",
		}
	}
}

/// Value compared against a column.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
	Integer(i64),
	Text(String),
	DateTime(DateTime<Utc>),
}

impl From<i64> for FilterValue {
	fn from(value: i64) -> Self {
		FilterValue::Integer(value)
	}
}

impl From<&str> for FilterValue {
	fn from(value: &str) -> Self {
		FilterValue::Text(value.to_string())
	}
}

impl From<String> for FilterValue {
	fn from(value: String) -> Self {
		FilterValue::Text(value)
	}
}

impl From<DateTime<Utc>> for FilterValue {
	fn from(value: DateTime<Utc>) -> Self {
		FilterValue::DateTime(value)
	}
}

/// A single `field <op> value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
	pub field: String,
	pub operator: FilterOperator,
	pub value: FilterValue,
}

impl Filter {
	pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<FilterValue>) -> Self {
		Self {
			field: field.into(),
			operator,
			value: value.into(),
		}
	}
}

// Applies every bound value to a sqlx query builder, in order.
macro_rules! bind_values {
	($query:expr, $values:expr) => {{
		let mut query = $query;
		for value in $values {
			query = match value {
				FilterValue::Integer(v) => query.bind(*v),
				FilterValue::Text(v) => query.bind(v.clone()),
				FilterValue::DateTime(v) => query.bind(*v),
			};
		}
		query
	}};
}

/// Lazy query over model `M`.
pub struct QuerySet<M: Model> {
	db: Database,
	filters: Vec<Filter>,
	ordering: Vec<String>,
	limit: Option<i64>,
	_marker: PhantomData<M>,
}

impl<M: Model> Clone for QuerySet<M> {
	fn clone(&self) -> Self {
		Self {
			db: self.db.clone(),
			filters: self.filters.clone(),
			ordering: self.ordering.clone(),
			limit: self.limit,
			_marker: PhantomData,
		}
	}
}

impl<M: Model> fmt::Debug for QuerySet<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QuerySet")
			.field("table", &M::table_name())
			.field("filters", &self.filters)
			.field("ordering", &self.ordering)
			.field("limit", &self.limit)
			.finish()
	}
}

impl<M: Model> QuerySet<M> {
	pub fn new(db: Database) -> Self {
		Self {
			db,
			filters: Vec::new(),
			ordering: Vec::new(),
			limit: None,
			_marker: PhantomData,
		}
	}

	/// Add a condition; conditions are AND-ed together.
	pub fn filter(mut self, filter: Filter) -> Self {
		self.filters.push(filter);
		self
	}

	/// Order by the given fields; a leading `-` sorts descending.
	///
	/// Replaces any ordering set earlier.
	pub fn order_by(mut self, fields: &[&str]) -> Self {
		self.ordering = fields.iter().map(|f| f.to_string()).collect();
		self
	}

	/// Keep at most `n` rows.
	pub fn limit(mut self, n: i64) -> Self {
		self.limit = Some(n);
		self
	}

	fn check_field(field: &str) -> Result<()> {
		if M::columns().contains(&field) {
			Ok(())
		} else {
			Err(Error::InvalidField {
				field: field.to_string(),
				table: M::table_name(),
			})
		}
	}

	fn where_clause(&self) -> Result<(String, Vec<FilterValue>)> {
		if self.filters.is_empty() {
			return Ok((String::new(), Vec::new()));
		}

		let mut conditions = Vec::with_capacity(self.filters.len());
		let mut values = Vec::with_capacity(self.filters.len());
		for filter in &self.filters {
			Self::check_field(&filter.field)?;
			conditions.push(format!("{} {} ?", filter.field, filter.operator.as_sql()));
			values.push(filter.value.clone());
		}
		Ok((format!(" WHERE {}", conditions.join(" AND ")), values))
	}

	fn order_clause(&self) -> Result<String> {
		if self.ordering.is_empty() {
			return Ok(String::new());
		}

		let mut terms = Vec::with_capacity(self.ordering.len());
		for field in &self.ordering {
			let (name, direction) = match field.strip_prefix('-') {
				Some(name) => (name, "DESC"),
				None => (field.as_str(), "ASC"),
			};
			Self::check_field(name)?;
			terms.push(format!("{} {}", name, direction));
		}
		Ok(format!(" ORDER BY {}", terms.join(", ")))
	}

	/// SQL for fetching rows, with its bound values.
	pub fn to_sql(&self) -> Result<(String, Vec<FilterValue>)> {
		let (where_clause, values) = self.where_clause()?;
		let order_clause = self.order_clause()?;
		let limit_clause = self
			.limit
			.map(|n| format!(" LIMIT {}", n))
			.unwrap_or_default();

		let sql = format!(
			"SELECT {} FROM {}{}{}{}",
			M::columns().join(", "),
			M::table_name(),
			where_clause,
			order_clause,
			limit_clause
		);
		Ok((sql, values))
	}

	/// Fetch every matching row.
	pub async fn all(&self) -> Result<Vec<M>> {
		let (sql, values) = self.to_sql()?;
		tracing::trace!(sql = %sql, "Executing query");

		let query = bind_values!(sqlx::query_as::<Sqlite, M>(&sql), &values);
		Ok(query.fetch_all(self.db.pool()).await?)
	}

	/// First matching row, if any.
	pub async fn first(&self) -> Result<Option<M>> {
		let rows = self.clone().limit(1).all().await?;
		Ok(rows.into_iter().next())
	}

	/// Exactly one matching row.
	///
	/// # Errors
	///
	/// [`Error::NotFound`] when nothing matches and
	/// [`Error::MultipleObjectsReturned`] when more than one row does.
	pub async fn get(&self) -> Result<M> {
		let mut rows = self.clone().limit(2).all().await?;
		match rows.len() {
			0 => Err(Error::NotFound(format!(
				"{} matching query does not exist.",
				M::verbose_name()
			))),
			1 => Ok(rows.remove(0)),
			_ => Err(Error::MultipleObjectsReturned(format!(
				"get() returned more than one {}",
				M::verbose_name()
			))),
		}
	}

	/// Number of matching rows (ignores ordering and limit).
	pub async fn count(&self) -> Result<i64> {
		let (where_clause, values) = self.where_clause()?;
		let sql = format!("SELECT COUNT(*) FROM {}{}", M::table_name(), where_clause);

		let query = bind_values!(sqlx::query_scalar::<Sqlite, i64>(&sql), &values);
		Ok(query.fetch_one(self.db.pool()).await?)
	}

	pub async fn exists(&self) -> Result<bool> {
		Ok(self.count().await? > 0)
	}
}
