use std::marker::PhantomData;

use super::query::{Filter, FilterOperator, FilterValue, QuerySet};
use super::{Database, Model};
use crate::exception::Result;

/// Model manager (similar to Django's Manager)
/// Entry point for building querysets over one model.
pub struct Manager<M: Model> {
	db: Database,
	_marker: PhantomData<M>,
}

impl<M: Model> Manager<M> {
	pub fn new(db: Database) -> Self {
		Self {
			db,
			_marker: PhantomData,
		}
	}

	/// Get all records
	pub fn all(&self) -> QuerySet<M> {
		QuerySet::new(self.db.clone())
	}

	/// Filter records
	pub fn filter(&self, field: &str, operator: FilterOperator, value: impl Into<FilterValue>) -> QuerySet<M> {
		self.all().filter(Filter::new(field, operator, value))
	}

	/// Get a single record by primary key
	pub async fn get(&self, pk: i64) -> Result<M> {
		self.filter(M::primary_key_field(), FilterOperator::Eq, pk)
			.get()
			.await
	}

	pub async fn count(&self) -> Result<i64> {
		self.all().count().await
	}
}
