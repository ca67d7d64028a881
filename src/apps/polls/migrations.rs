//! Schema migrations for the polls application.

use sea_query::{Alias, ColumnDef, ForeignKey, ForeignKeyAction, Index, SqliteQueryBuilder, Table};

use super::APP_LABEL;
use crate::db::migrations::Migration;

pub fn migrations() -> Vec<Migration> {
	vec![Migration {
		app_label: APP_LABEL,
		name: "0001_initial",
		up: initial,
	}]
}

/// Create the question and choice tables.
fn initial() -> Vec<String> {
	let question = Table::create()
		.table(Alias::new("polls_question"))
		.if_not_exists()
		.col(
			ColumnDef::new(Alias::new("id"))
				.integer()
				.not_null()
				.auto_increment()
				.primary_key(),
		)
		.col(ColumnDef::new(Alias::new("question_text")).string_len(200).not_null())
		.col(
			ColumnDef::new(Alias::new("pub_date"))
				.timestamp_with_time_zone()
				.not_null(),
		)
		.to_owned()
		.to_string(SqliteQueryBuilder);

	let choice = Table::create()
		.table(Alias::new("polls_choice"))
		.if_not_exists()
		.col(
			ColumnDef::new(Alias::new("id"))
				.integer()
				.not_null()
				.auto_increment()
				.primary_key(),
		)
		.col(ColumnDef::new(Alias::new("question_id")).integer().not_null())
		.col(ColumnDef::new(Alias::new("choice_text")).string_len(200).not_null())
		.col(
			ColumnDef::new(Alias::new("votes"))
				.integer()
				.not_null()
				.default(0),
		)
		.foreign_key(
			ForeignKey::create()
				.name("fk_polls_choice_question")
				.from(Alias::new("polls_choice"), Alias::new("question_id"))
				.to(Alias::new("polls_question"), Alias::new("id"))
				.on_delete(ForeignKeyAction::Cascade),
		)
		.to_owned()
		.to_string(SqliteQueryBuilder);

	let choice_question_index = Index::create()
		.name("polls_choice_question_id_idx")
		.table(Alias::new("polls_choice"))
		.col(Alias::new("question_id"))
		.to_owned()
		.to_string(SqliteQueryBuilder);

	let question_pub_date_index = Index::create()
		.name("polls_question_pub_date_idx")
		.table(Alias::new("polls_question"))
		.col(Alias::new("pub_date"))
		.to_owned()
		.to_string(SqliteQueryBuilder);

	vec![question, choice, choice_question_index, question_pub_date_index]
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_initial_creates_both_tables() {
		let statements = initial();
		assert_eq!(statements.len(), 4);
		assert!(statements[0].contains("\"polls_question\""));
		assert!(statements[1].contains("\"polls_choice\""));
	}

	#[rstest]
	fn test_choice_cascades_on_question_delete() {
		let statements = initial();
		assert!(statements[1].contains("ON DELETE CASCADE"));
		assert!(statements[1].contains("DEFAULT 0"));
	}
}
