use chrono::Utc;
use hyper::Method;
use serde::Serialize;
use tracing::debug;

use super::models::{Choice, Question};
use super::serializers::VoteForm;
use crate::exception::Error;
use crate::http::{Request, Response, ViewResult, require_http_methods};
use crate::shortcuts::{get_object_or_404, redirect_to, render};
use crate::state::AppState;

/// Message shown when a vote is submitted without a valid choice.
pub const NO_CHOICE_MESSAGE: &str = "You didn't select a choice.";

#[derive(Debug, Serialize)]
struct IndexContext {
	latest_question_list: Vec<Question>,
}

#[derive(Debug, Serialize)]
struct QuestionContext {
	question: Question,
	choices: Vec<Choice>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error_message: Option<&'static str>,
}

/// Index view - the most recently published questions
///
/// GET /polls/
pub async fn index(request: Request, state: AppState) -> ViewResult<Response> {
	require_http_methods(&request, &[Method::GET, Method::HEAD])?;

	let latest_question_list = Question::published(&state.db, Utc::now())
		.limit(state.settings.index_page_size)
		.all()
		.await?;

	render("polls/index.html", &IndexContext { latest_question_list })
}

/// Published question, or a 404 for unknown and future-dated ones.
async fn published_question(request: &Request, state: &AppState) -> ViewResult<(i64, Question)> {
	let question_id: i64 = request.path_param("question_id")?;
	let question = get_object_or_404(Question::published(&state.db, Utc::now()), question_id).await?;
	Ok((question_id, question))
}

async fn question_page(
	template_name: &str,
	state: &AppState,
	question: Question,
	error_message: Option<&'static str>,
) -> ViewResult<Response> {
	let choices = question.choices(&state.db)?.all().await?;
	render(
		template_name,
		&QuestionContext {
			question,
			choices,
			error_message,
		},
	)
}

/// Detail view - a question with its voting form
///
/// GET /polls/{question_id}/
pub async fn detail(request: Request, state: AppState) -> ViewResult<Response> {
	require_http_methods(&request, &[Method::GET, Method::HEAD])?;
	let (_, question) = published_question(&request, &state).await?;
	question_page("polls/detail.html", &state, question, None).await
}

/// Results view - vote counts for a question
///
/// GET /polls/{question_id}/results/
pub async fn results(request: Request, state: AppState) -> ViewResult<Response> {
	require_http_methods(&request, &[Method::GET, Method::HEAD])?;
	let (_, question) = published_question(&request, &state).await?;
	question_page("polls/results.html", &state, question, None).await
}

/// Vote view - record a vote and redirect to the results
///
/// POST /polls/{question_id}/vote/
///
/// A missing or unknown choice redisplays the form with an error message.
pub async fn vote(request: Request, state: AppState) -> ViewResult<Response> {
	require_http_methods(&request, &[Method::POST])?;
	let (question_id, question) = published_question(&request, &state).await?;

	let form = VoteForm::from(request.form::<Vec<(String, String)>>()?);
	let Some(choice_id) = form.selected_choice() else {
		debug!(question_id, "Vote submitted without a choice");
		return question_page("polls/detail.html", &state, question, Some(NO_CHOICE_MESSAGE)).await;
	};

	match Choice::vote(&state.db, question_id, choice_id).await {
		Ok(_) => {
			let question_id = question_id.to_string();
			redirect_to("polls:results", &[("question_id", question_id.as_str())])
		}
		Err(Error::NotFound(_)) => {
			debug!(question_id, choice_id, "Vote for unknown choice");
			question_page("polls/detail.html", &state, question, Some(NO_CHOICE_MESSAGE)).await
		}
		Err(e) => Err(e),
	}
}
