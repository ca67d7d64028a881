use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use tracing::debug;
use validator::Validate;

use super::serializers::{ChoiceSerializer, QuestionSerializer};
use crate::db::{Database, FilterOperator, Model, QuerySet};
use crate::exception::{Error, Result};

/// The current time shifted by `days`, negative for the past.
///
/// Offsets that leave chrono's representable range are a validation error.
pub fn days_from_now(days: i64) -> Result<DateTime<Utc>> {
	TimeDelta::try_days(days)
		.and_then(|offset| Utc::now().checked_add_signed(offset))
		.ok_or_else(|| Error::Validation(format!("pub_date: {} days from now is out of range", days)))
}

/// Question model representing a poll question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Question {
	/// `None` until the question is saved.
	pub id: Option<i64>,
	pub question_text: String,
	pub pub_date: DateTime<Utc>,
}

/// Rows removed by [`Question::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteSummary {
	pub questions: u64,
	/// Choices removed through the cascade.
	pub choices: u64,
}

impl DeleteSummary {
	pub fn total(&self) -> u64 {
		self.questions + self.choices
	}
}

impl Question {
	/// Build an unsaved question.
	pub fn new(question_text: impl Into<String>, pub_date: DateTime<Utc>) -> Self {
		Self {
			id: None,
			question_text: question_text.into(),
			pub_date,
		}
	}

	/// Validate and insert a new question.
	pub async fn create(
		db: &Database,
		question_text: impl Into<String>,
		pub_date: DateTime<Utc>,
	) -> Result<Self> {
		let mut question = Self::new(question_text, pub_date);
		question.save(db).await?;
		Ok(question)
	}

	/// Insert the question, or update it if it already has an id.
	pub async fn save(&mut self, db: &Database) -> Result<()> {
		QuestionSerializer {
			question_text: self.question_text.clone(),
		}
		.validate()?;

		match self.id {
			None => {
				let id: i64 = sqlx::query_scalar(
					"INSERT INTO polls_question (question_text, pub_date) VALUES (?, ?) RETURNING id",
				)
				.bind(&self.question_text)
				.bind(self.pub_date)
				.fetch_one(db.pool())
				.await?;
				self.id = Some(id);
				debug!(question_id = id, "Created question");
			}
			Some(id) => {
				let result =
					sqlx::query("UPDATE polls_question SET question_text = ?, pub_date = ? WHERE id = ?")
						.bind(&self.question_text)
						.bind(self.pub_date)
						.bind(id)
						.execute(db.pool())
						.await?;
				if result.rows_affected() == 0 {
					return Err(Error::NotFound(
						"Question matching query does not exist.".to_string(),
					));
				}
			}
		}
		Ok(())
	}

	/// Check if the question was published within the last day.
	///
	/// Future-dated questions are not recent.
	///
	/// # Examples
	///
	/// ```
	/// use chrono::{Duration, Utc};
	/// use polls::apps::polls::models::Question;
	///
	/// let fresh = Question::new("Fresh?", Utc::now() - Duration::hours(23));
	/// assert!(fresh.was_published_recently());
	///
	/// let future = Question::new("Future?", Utc::now() + Duration::days(30));
	/// assert!(!future.was_published_recently());
	/// ```
	pub fn was_published_recently(&self) -> bool {
		self.was_published_recently_at(Utc::now())
	}

	/// [`Question::was_published_recently`] against an explicit clock reading.
	pub fn was_published_recently_at(&self, now: DateTime<Utc>) -> bool {
		let window_start = now.checked_sub_signed(Duration::days(1));
		window_start.is_none_or(|start| start <= self.pub_date) && self.pub_date <= now
	}

	/// Questions published at or before `now`, newest first.
	pub fn published(db: &Database, now: DateTime<Utc>) -> QuerySet<Self> {
		Self::objects(db)
			.filter("pub_date", FilterOperator::Lte, now)
			.order_by(&["-pub_date"])
	}

	fn saved_id(&self) -> Result<i64> {
		self.id.ok_or_else(|| {
			Error::Validation(
				"'Question' instance needs to have a primary key value before this relationship can be used."
					.to_string(),
			)
		})
	}

	/// Choices of this question, in creation order.
	pub fn choices(&self, db: &Database) -> Result<QuerySet<Choice>> {
		let id = self.saved_id()?;
		Ok(Choice::objects(db)
			.filter("question_id", FilterOperator::Eq, id)
			.order_by(&["id"]))
	}

	/// Add a choice with no votes.
	pub async fn create_choice(&self, db: &Database, choice_text: impl Into<String>) -> Result<Choice> {
		let mut choice = Choice::new(self.saved_id()?, choice_text);
		choice.save(db).await?;
		Ok(choice)
	}

	/// Delete the question together with its choices.
	pub async fn delete(&self, db: &Database) -> Result<DeleteSummary> {
		let id = self.saved_id()?;

		let mut tx = db.pool().begin().await?;
		let choices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM polls_choice WHERE question_id = ?")
			.bind(id)
			.fetch_one(&mut *tx)
			.await?;
		let result = sqlx::query("DELETE FROM polls_question WHERE id = ?")
			.bind(id)
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;

		if result.rows_affected() == 0 {
			return Err(Error::NotFound(
				"Question matching query does not exist.".to_string(),
			));
		}

		let summary = DeleteSummary {
			questions: result.rows_affected(),
			choices: choices.max(0) as u64,
		};
		debug!(question_id = id, choices = summary.choices, "Deleted question");
		Ok(summary)
	}
}

impl fmt::Display for Question {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.question_text)
	}
}

impl Model for Question {
	fn table_name() -> &'static str {
		"polls_question"
	}

	fn columns() -> &'static [&'static str] {
		&["id", "question_text", "pub_date"]
	}

	fn verbose_name() -> &'static str {
		"Question"
	}

	fn primary_key(&self) -> Option<i64> {
		self.id
	}
}

/// Choice model representing an answer option for a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Choice {
	pub id: Option<i64>,
	pub question_id: i64,
	pub choice_text: String,
	pub votes: i64,
}

impl Choice {
	/// Build an unsaved choice with no votes.
	pub fn new(question_id: i64, choice_text: impl Into<String>) -> Self {
		Self {
			id: None,
			question_id,
			choice_text: choice_text.into(),
			votes: 0,
		}
	}

	pub async fn save(&mut self, db: &Database) -> Result<()> {
		ChoiceSerializer {
			question_id: self.question_id,
			choice_text: self.choice_text.clone(),
		}
		.validate()?;

		match self.id {
			None => {
				let id: i64 = sqlx::query_scalar(
					"INSERT INTO polls_choice (question_id, choice_text, votes) VALUES (?, ?, ?) RETURNING id",
				)
				.bind(self.question_id)
				.bind(&self.choice_text)
				.bind(self.votes)
				.fetch_one(db.pool())
				.await?;
				self.id = Some(id);
			}
			Some(id) => {
				let result = sqlx::query(
					"UPDATE polls_choice SET question_id = ?, choice_text = ?, votes = ? WHERE id = ?",
				)
				.bind(self.question_id)
				.bind(&self.choice_text)
				.bind(self.votes)
				.bind(id)
				.execute(db.pool())
				.await?;
				if result.rows_affected() == 0 {
					return Err(Error::NotFound(
						"Choice matching query does not exist.".to_string(),
					));
				}
			}
		}
		Ok(())
	}

	/// Record one vote for `choice_id`, which must belong to `question_id`.
	///
	/// The increment happens in a single `UPDATE`, so concurrent votes are
	/// never lost. Returns the choice with its new total.
	pub async fn vote(db: &Database, question_id: i64, choice_id: i64) -> Result<Choice> {
		let choice = sqlx::query_as::<_, Choice>(
			"UPDATE polls_choice SET votes = votes + 1 WHERE id = ? AND question_id = ? \
			 RETURNING id, question_id, choice_text, votes",
		)
		.bind(choice_id)
		.bind(question_id)
		.fetch_optional(db.pool())
		.await?
		.ok_or_else(|| Error::NotFound("Choice matching query does not exist.".to_string()))?;

		debug!(question_id, choice_id, votes = choice.votes, "Recorded vote");
		Ok(choice)
	}
}

impl fmt::Display for Choice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.choice_text)
	}
}

impl Model for Choice {
	fn table_name() -> &'static str {
		"polls_choice"
	}

	fn columns() -> &'static [&'static str] {
		&["id", "question_id", "choice_text", "votes"]
	}

	fn verbose_name() -> &'static str {
		"Choice"
	}

	fn primary_key(&self) -> Option<i64> {
		self.id
	}
}
