//! HTML templates.
//!
//! Templates are compiled into the binary and registered once. Names ending
//! in `.html` are autoescaped. Besides Tera's built-ins, templates can call
//! `url(name="polls:detail", question_id=3)` to reverse a route.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

use crate::exception::Result;

const TEMPLATES: &[(&str, &str)] = &[
	("polls/index.html", include_str!("../templates/polls/index.html")),
	("polls/detail.html", include_str!("../templates/polls/detail.html")),
	("polls/results.html", include_str!("../templates/polls/results.html")),
];

static TERA: Lazy<Tera> = Lazy::new(|| {
	let mut tera = Tera::default();
	tera.add_raw_templates(TEMPLATES.iter().copied())
		.expect("Failed to add polls templates");
	tera.register_function("url", url);
	tera
});

/// Tera function reversing a named route; every argument but `name` is a
/// route parameter.
fn url(args: &HashMap<String, Value>) -> tera::Result<Value> {
	let name = args
		.get("name")
		.and_then(Value::as_str)
		.ok_or_else(|| tera::Error::msg("url() requires a string `name` argument"))?;

	let values: Vec<(&str, String)> = args
		.iter()
		.filter(|(key, _)| key.as_str() != "name")
		.map(|(key, value)| {
			let value = match value {
				Value::String(s) => s.clone(),
				other => other.to_string(),
			};
			(key.as_str(), value)
		})
		.collect();
	let kwargs: Vec<(&str, &str)> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();

	crate::urls::reverse(name, &kwargs)
		.map(Value::String)
		.map_err(|e| tera::Error::msg(e.to_string()))
}

/// Render a registered template.
pub fn render_to_string(template_name: &str, context: &Context) -> Result<String> {
	Ok(TERA.render(template_name, context)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn context(value: serde_json::Value) -> Context {
		Context::from_value(value).unwrap()
	}

	#[rstest]
	fn test_index_without_questions() {
		let html = render_to_string("polls/index.html", &context(json!({ "latest_question_list": [] }))).unwrap();
		assert!(html.contains("No polls are available."));
		assert!(!html.contains("<ul>"));
	}

	#[rstest]
	fn test_index_links_to_detail() {
		let ctx = context(json!({
			"latest_question_list": [{ "id": 4, "question_text": "Past question." }]
		}));
		let html = render_to_string("polls/index.html", &ctx).unwrap();
		assert!(html.contains(r#"<a href="/polls/4/">Past question.</a>"#));
	}

	#[rstest]
	fn test_question_text_is_escaped() {
		let ctx = context(json!({
			"latest_question_list": [{ "id": 1, "question_text": "<script>alert(1)</script>" }]
		}));
		let html = render_to_string("polls/index.html", &ctx).unwrap();
		assert!(!html.contains("<script>"));
		assert!(html.contains("&lt;script&gt;"));
	}

	#[rstest]
	#[case(0, "0 votes")]
	#[case(1, "1 vote<")]
	#[case(2, "2 votes")]
	fn test_results_pluralizes_votes(#[case] votes: i64, #[case] expected: &str) {
		let ctx = context(json!({
			"question": { "id": 1, "question_text": "Q" },
			"choices": [{ "id": 1, "choice_text": "A", "votes": votes }]
		}));
		let html = render_to_string("polls/results.html", &ctx).unwrap();
		assert!(html.contains(expected), "{}", html);
	}

	#[rstest]
	fn test_detail_shows_error_message_only_when_set() {
		let base = json!({
			"question": { "id": 2, "question_text": "Q" },
			"choices": [{ "id": 7, "choice_text": "A", "votes": 0 }]
		});
		let html = render_to_string("polls/detail.html", &context(base.clone())).unwrap();
		assert!(!html.contains("<strong>"));
		assert!(html.contains(r#"action="/polls/2/vote/""#));
		assert!(html.contains(r#"value="7""#));

		let mut with_error = base;
		with_error["error_message"] = json!("Pick one");
		let html = render_to_string("polls/detail.html", &context(with_error)).unwrap();
		assert!(html.contains("<strong>Pick one</strong>"));
	}

	#[rstest]
	fn test_url_requires_name() {
		let err = url(&HashMap::new()).unwrap_err();
		assert!(err.to_string().contains("name"));
	}
}
