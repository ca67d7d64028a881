use std::sync::Arc;

use crate::config::Settings;
use crate::db::Database;

/// Shared state handed to every view.
#[derive(Debug, Clone)]
pub struct AppState {
	pub db: Database,
	pub settings: Arc<Settings>,
}

impl AppState {
	pub fn new(db: Database, settings: Settings) -> Self {
		Self {
			db,
			settings: Arc::new(settings),
		}
	}
}
