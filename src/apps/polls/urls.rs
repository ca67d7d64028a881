use super::views;
use crate::urls::{UrlPattern, path};

/// Namespace of the polls routes (`polls:detail`, ...).
pub const APP_NAME: &str = "polls";

pub fn urlpatterns() -> Vec<UrlPattern> {
	vec![
		path("", views::index, "index"),
		path("<int:question_id>/", views::detail, "detail"),
		path("<int:question_id>/results/", views::results, "results"),
		path("<int:question_id>/vote/", views::vote, "vote"),
	]
}
