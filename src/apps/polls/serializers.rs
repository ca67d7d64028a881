use serde::{Deserialize, Serialize};
use validator::Validate;

/// Serializer for creating questions
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct QuestionSerializer {
	#[validate(length(
		min = 1,
		max = 200,
		message = "Question text must be between 1 and 200 characters"
	))]
	pub question_text: String,
}

/// Serializer for creating choices
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChoiceSerializer {
	pub question_id: i64,

	#[validate(length(
		min = 1,
		max = 200,
		message = "Choice text must be between 1 and 200 characters"
	))]
	pub choice_text: String,
}

/// Body of the vote form.
///
/// `choice` stays a string so a missing or garbled value can be reported
/// back on the form instead of failing the whole request. When the field is
/// repeated the last value wins.
#[derive(Debug, Default)]
pub struct VoteForm {
	pub choice: Option<String>,
}

impl VoteForm {
	/// Selected choice id, if one was submitted and is a number.
	pub fn selected_choice(&self) -> Option<i64> {
		self.choice.as_deref().and_then(|c| c.trim().parse().ok())
	}
}

impl From<Vec<(String, String)>> for VoteForm {
	fn from(fields: Vec<(String, String)>) -> Self {
		let choice = fields
			.into_iter()
			.filter(|(key, _)| key == "choice")
			.map(|(_, value)| value)
			.last();
		Self { choice }
	}
}
