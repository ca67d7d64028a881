//! Root URL configuration.

use crate::apps::polls;
use crate::urls::{UrlPattern, include};

pub fn urlpatterns() -> Vec<UrlPattern> {
	include("polls/", polls::urls::APP_NAME, polls::urls::urlpatterns())
}
