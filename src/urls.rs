//! URL routing.
//!
//! Routes use Django's syntax: `"<int:question_id>/results/"` captures an
//! integer segment named `question_id`. Application patterns are mounted
//! under a prefix and namespace with [`include`], and named routes can be
//! turned back into paths with [`reverse`].
//!
//! # Examples
//!
//! ```
//! use polls::urls::reverse;
//!
//! let url = reverse("polls:detail", &[("question_id", "3")]).unwrap();
//! assert_eq!(url, "/polls/3/");
//! ```

use futures::FutureExt;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::exception::{Error, Result};
use crate::http::{Request, Response};
use crate::state::AppState;

/// Type-erased view function.
pub type ViewFn = Arc<dyn Fn(Request, AppState) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"<(?:(?P<converter>[a-z]+):)?(?P<name>[A-Za-z_][A-Za-z0-9_]*)>")
		.expect("placeholder pattern is valid")
});

/// Path converter of a captured segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
	Int,
	Str,
	Slug,
	Path,
}

impl Converter {
	fn from_name(name: &str) -> Option<Self> {
		match name {
			"int" => Some(Converter::Int),
			"str" => Some(Converter::Str),
			"slug" => Some(Converter::Slug),
			"path" => Some(Converter::Path),
			_ => None,
		}
	}

	fn regex(self) -> &'static str {
		match self {
			Converter::Int => "[0-9]+",
			Converter::Str => "[^/]+",
			Converter::Slug => "[-a-zA-Z0-9_]+",
			Converter::Path => ".+",
		}
	}

	/// Whether `value` could have been captured by this converter.
	fn accepts(self, value: &str) -> bool {
		!value.is_empty()
			&& match self {
				Converter::Int => value.bytes().all(|b| b.is_ascii_digit()),
				Converter::Str => !value.contains('/'),
				Converter::Slug => value
					.bytes()
					.all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'),
				Converter::Path => true,
			}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Param { name: String, converter: Converter },
}

fn parse_route(route: &str) -> Vec<Segment> {
	let mut segments = Vec::new();
	let mut last = 0;

	for caps in PLACEHOLDER.captures_iter(route) {
		let Some(whole) = caps.get(0) else { continue };
		if whole.start() > last {
			segments.push(Segment::Literal(route[last..whole.start()].to_string()));
		}
		let converter_name = caps.name("converter").map(|m| m.as_str()).unwrap_or("str");
		let converter = Converter::from_name(converter_name)
			.unwrap_or_else(|| panic!("Unknown path converter '{}' in route '{}'", converter_name, route));
		segments.push(Segment::Param {
			name: caps["name"].to_string(),
			converter,
		});
		last = whole.end();
	}
	if last < route.len() {
		segments.push(Segment::Literal(route[last..].to_string()));
	}
	segments
}

fn compile(segments: &[Segment]) -> Regex {
	let mut pattern = String::from("^/");
	for segment in segments {
		match segment {
			Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
			Segment::Param { name, converter } => {
				pattern.push_str(&format!("(?P<{}>{})", name, converter.regex()))
			}
		}
	}
	pattern.push('$');
	// Literals are escaped and converter patterns are fixed, so this only
	// fails on duplicate parameter names.
	Regex::new(&pattern).unwrap_or_else(|e| panic!("Invalid route pattern {}: {}", pattern, e))
}

/// A route bound to a view.
#[derive(Clone)]
pub struct UrlPattern {
	segments: Vec<Segment>,
	regex: Regex,
	name: Option<String>,
	view: ViewFn,
}

impl fmt::Debug for UrlPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UrlPattern")
			.field("route", &self.route())
			.field("name", &self.name)
			.finish()
	}
}

impl UrlPattern {
	fn new(segments: Vec<Segment>, name: Option<String>, view: ViewFn) -> Self {
		let regex = compile(&segments);
		Self {
			segments,
			regex,
			name,
			view,
		}
	}

	/// Route as written, relative to the site root.
	pub fn route(&self) -> String {
		self.segments
			.iter()
			.map(|segment| match segment {
				Segment::Literal(text) => text.clone(),
				Segment::Param { name, converter } => {
					let converter = match converter {
						Converter::Int => "int",
						Converter::Str => "str",
						Converter::Slug => "slug",
						Converter::Path => "path",
					};
					format!("<{}:{}>", converter, name)
				}
			})
			.collect()
	}

	/// Fully qualified name (`namespace:name`), if the route is named.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Mount under `prefix` and `namespace`.
	fn mounted(self, prefix: &str, namespace: &str) -> Self {
		let route = format!("{}{}", prefix, self.route());
		let name = self.name.map(|name| format!("{}:{}", namespace, name));
		Self::new(parse_route(&route), name, self.view)
	}

	fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
		let caps = self.regex.captures(path)?;
		let kwargs = self
			.regex
			.capture_names()
			.flatten()
			.filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
			.collect();
		Some(kwargs)
	}

	fn reverse(&self, kwargs: &HashMap<&str, &str>) -> Result<String> {
		let mut url = String::from("/");
		for segment in &self.segments {
			match segment {
				Segment::Literal(text) => url.push_str(text),
				Segment::Param { name, converter } => {
					let value = kwargs.get(name.as_str()).ok_or_else(|| {
						Error::NoReverseMatch(format!("Missing argument '{}' for route '{}'", name, self.route()))
					})?;
					if !converter.accepts(value) {
						return Err(Error::NoReverseMatch(format!(
							"Value '{}' does not match '{}' in route '{}'",
							value,
							name,
							self.route()
						)));
					}
					url.push_str(value);
				}
			}
		}
		Ok(url)
	}

	fn param_names(&self) -> Vec<&str> {
		self.segments
			.iter()
			.filter_map(|segment| match segment {
				Segment::Param { name, .. } => Some(name.as_str()),
				Segment::Literal(_) => None,
			})
			.collect()
	}
}

/// Bind `route` to `view` under `name`.
///
/// # Panics
///
/// Panics on an unknown converter or a repeated parameter name, since
/// either is a wiring mistake caught when the URL configuration loads.
pub fn path<F, Fut>(route: &str, view: F, name: &str) -> UrlPattern
where
	F: Fn(Request, AppState) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	let view: ViewFn = Arc::new(move |request, state| view(request, state).boxed());
	let name = (!name.is_empty()).then(|| name.to_string());
	UrlPattern::new(parse_route(route), name, view)
}

/// Mount `patterns` under `prefix`, naming them `namespace:name`.
pub fn include(prefix: &str, namespace: &str, patterns: Vec<UrlPattern>) -> Vec<UrlPattern> {
	patterns
		.into_iter()
		.map(|pattern| pattern.mounted(prefix, namespace))
		.collect()
}

/// Outcome of a successful [`UrlResolver::resolve`].
#[derive(Clone)]
pub struct ResolverMatch {
	pub view: ViewFn,
	pub kwargs: HashMap<String, String>,
	pub url_name: Option<String>,
	pub route: String,
}

impl fmt::Debug for ResolverMatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolverMatch")
			.field("kwargs", &self.kwargs)
			.field("url_name", &self.url_name)
			.field("route", &self.route)
			.finish()
	}
}

/// Ordered list of patterns; the first match wins.
#[derive(Debug, Clone)]
pub struct UrlResolver {
	patterns: Vec<UrlPattern>,
}

impl UrlResolver {
	pub fn new(patterns: Vec<UrlPattern>) -> Self {
		Self { patterns }
	}

	pub fn patterns(&self) -> &[UrlPattern] {
		&self.patterns
	}

	/// Find the view for `path` (which starts with `/`).
	pub fn resolve(&self, path: &str) -> Option<ResolverMatch> {
		self.patterns.iter().find_map(|pattern| {
			pattern.matches(path).map(|kwargs| ResolverMatch {
				view: Arc::clone(&pattern.view),
				kwargs,
				url_name: pattern.name.clone(),
				route: pattern.route(),
			})
		})
	}

	/// Build the path of the route called `name`.
	///
	/// Every parameter of the route must be supplied and must fit its
	/// converter; extra arguments are rejected.
	pub fn reverse(&self, name: &str, kwargs: &[(&str, &str)]) -> Result<String> {
		let kwargs: HashMap<&str, &str> = kwargs.iter().copied().collect();
		let candidates: Vec<&UrlPattern> = self.patterns.iter().filter(|p| p.name() == Some(name)).collect();
		if candidates.is_empty() {
			return Err(Error::NoReverseMatch(format!(
				"Reverse for '{}' not found. '{}' is not a valid view function or pattern name.",
				name, name
			)));
		}

		let mut last_error = None;
		for pattern in candidates {
			if let Some(extra) = kwargs.keys().find(|k| !pattern.param_names().contains(*k)) {
				last_error = Some(Error::NoReverseMatch(format!(
					"Unexpected argument '{}' for '{}'",
					extra, name
				)));
				continue;
			}
			match pattern.reverse(&kwargs) {
				Ok(url) => return Ok(url),
				Err(e) => last_error = Some(e),
			}
		}
		Err(last_error.unwrap_or_else(|| Error::NoReverseMatch(name.to_string())))
	}
}

static URLCONF: Lazy<UrlResolver> = Lazy::new(|| UrlResolver::new(crate::config::urls::urlpatterns()));

/// The project's root URL configuration.
pub fn root_urlconf() -> &'static UrlResolver {
	&URLCONF
}

/// Reverse `name` against the root URL configuration.
pub fn reverse(name: &str, kwargs: &[(&str, &str)]) -> Result<String> {
	root_urlconf().reverse(name, kwargs)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::*;

	async fn noop(_request: Request, _state: AppState) -> Result<Response> {
		Ok(Response::ok())
	}

	#[fixture]
	fn resolver() -> UrlResolver {
		let app = vec![
			path("", noop, "index"),
			path("<int:question_id>/", noop, "detail"),
			path("<int:question_id>/results/", noop, "results"),
			path("tags/<slug:tag>/", noop, "tag"),
		];
		UrlResolver::new(include("polls/", "polls", app))
	}

	#[rstest]
	fn test_resolve_captures_int(resolver: UrlResolver) {
		let matched = resolver.resolve("/polls/34/results/").unwrap();
		assert_eq!(matched.url_name.as_deref(), Some("polls:results"));
		assert_eq!(matched.kwargs.get("question_id").map(String::as_str), Some("34"));
		assert_eq!(matched.route, "polls/<int:question_id>/results/");
	}

	#[rstest]
	#[case("/polls/abc/")]
	#[case("/polls/1")]
	#[case("/polls/-1/")]
	#[case("/other/")]
	fn test_resolve_rejects(resolver: UrlResolver, #[case] path: &str) {
		assert!(resolver.resolve(path).is_none());
	}

	#[rstest]
	fn test_reverse_round_trips(resolver: UrlResolver) {
		assert_eq!(resolver.reverse("polls:index", &[]).unwrap(), "/polls/");
		let url = resolver.reverse("polls:detail", &[("question_id", "5")]).unwrap();
		assert_eq!(url, "/polls/5/");
		assert!(resolver.resolve(&url).is_some());
	}

	#[rstest]
	#[case("polls:detail", &[])]
	#[case("polls:detail", &[("question_id", "x")])]
	#[case("polls:detail", &[("question_id", "1"), ("extra", "2")])]
	#[case("polls:tag", &[("tag", "a/b")])]
	#[case("detail", &[("question_id", "1")])]
	fn test_reverse_errors(resolver: UrlResolver, #[case] name: &str, #[case] kwargs: &[(&str, &str)]) {
		let result = resolver.reverse(name, kwargs);
		assert!(matches!(result, Err(Error::NoReverseMatch(_))));
	}

	#[rstest]
	#[should_panic(expected = "Unknown path converter")]
	fn test_unknown_converter_panics() {
		path("<uuid:id>/", noop, "broken");
	}

	#[rstest]
	fn test_root_urlconf_names_polls_routes() {
		let names: Vec<_> = root_urlconf().patterns().iter().filter_map(|p| p.name()).collect();
		assert_eq!(names, vec!["polls:index", "polls:detail", "polls:results", "polls:vote"]);
	}
}
