//! View helpers in the spirit of `django.shortcuts`.

use serde::Serialize;
use tera::Context;

use crate::db::{FilterOperator, Model, QuerySet};
use crate::exception::{Error, Result};
use crate::http::Response;
use crate::templates;
use crate::urls;

/// Render `template_name` with `context` into a 200 HTML response.
///
/// The context travels with the response so tests can inspect it.
pub fn render<C: Serialize>(template_name: &str, context: &C) -> Result<Response> {
	let value = serde_json::to_value(context)?;
	let html = templates::render_to_string(template_name, &Context::from_value(value.clone())?)?;

	Ok(Response::ok()
		.with_html(html)
		.with_context(template_name, value))
}

/// 302 redirect to `url`.
pub fn redirect(url: impl AsRef<str>) -> Response {
	Response::temporary_redirect(url)
}

/// 302 redirect to the named route.
pub fn redirect_to(name: &str, kwargs: &[(&str, &str)]) -> Result<Response> {
	Ok(redirect(urls::reverse(name, kwargs)?))
}

/// Get the object with primary key `pk` from `queryset`, or a 404.
///
/// # Examples
///
/// ```rust,no_run
/// use chrono::Utc;
/// use polls::apps::polls::models::Question;
/// use polls::shortcuts::get_object_or_404;
///
/// # async fn example(db: polls::db::Database) -> polls::Result<()> {
/// let question = get_object_or_404(Question::published(&db, Utc::now()), 1).await?;
/// # Ok(())
/// # }
/// ```
pub async fn get_object_or_404<M: Model>(queryset: QuerySet<M>, pk: i64) -> Result<M> {
	let results = queryset
		.filter(crate::db::Filter::new(M::primary_key_field(), FilterOperator::Eq, pk))
		.limit(1)
		.all()
		.await?;

	results
		.into_iter()
		.next()
		.ok_or_else(|| Error::NotFound(format!("No {} matches the given query.", M::verbose_name())))
}

/// Fetch every object in `queryset`, or a 404 if there are none.
pub async fn get_list_or_404<M: Model>(queryset: QuerySet<M>) -> Result<Vec<M>> {
	let results = queryset.all().await?;
	if results.is_empty() {
		Err(Error::NotFound(format!("No {} matches the given query.", M::verbose_name())))
	} else {
		Ok(results)
	}
}
