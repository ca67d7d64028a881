//! Management commands.
//!
//! `manage <command>` parses the command line, loads settings, sets up
//! logging, and runs one of [`Commands`]. Command output goes to the
//! writer passed to [`run`] so it can be captured in tests.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::apps::{self, polls::models::{Question, days_from_now}};
use crate::config::Settings;
use crate::db::migrations::{self, Migration};
use crate::db::{Database, Model};
use crate::exception::{Error, Result};
use crate::logging;
use crate::server::{HttpServer, ProjectHandler};
use crate::state::AppState;
use crate::urls::root_urlconf;

/// Polls management interface
#[derive(Debug, Parser)]
#[command(name = "manage")]
#[command(about = "Polls management interface", long_about = None)]
#[command(version)]
pub struct Cli {
	/// Subcommand to execute
	#[command(subcommand)]
	pub command: Commands,

	/// Verbosity level (can be repeated for more output)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	pub verbosity: u8,

	/// Settings file to use instead of $POLLS_SETTINGS_FILE
	#[arg(long, value_name = "PATH", global = true)]
	pub settings: Option<PathBuf>,
}

/// Command-line interface commands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
	/// Start the development server
	Runserver {
		/// Server address (default: the `bind_address` setting)
		#[arg(value_name = "ADDRESS")]
		address: Option<String>,
	},

	/// Apply database migrations
	Migrate {
		/// Only migrate this app
		#[arg(value_name = "APP_LABEL")]
		app_label: Option<String>,

		/// Database connection string
		#[arg(long, value_name = "DATABASE")]
		database: Option<String>,

		/// Show migration plan without applying
		#[arg(long)]
		plan: bool,
	},

	/// List migrations and whether they are applied
	Showmigrations,

	/// List every URL pattern with its name
	Showurls,

	/// Create a poll question
	Createquestion {
		#[arg(value_name = "TEXT")]
		text: String,

		/// Publication date offset from now, in days (negative for the past)
		#[arg(long, default_value_t = 0, allow_negative_numbers = true)]
		days: i64,
	},

	/// Add a choice to an existing question
	Addchoice {
		#[arg(value_name = "QUESTION_ID")]
		question_id: i64,

		#[arg(value_name = "TEXT")]
		text: String,
	},

	/// Check the project for configuration problems
	Check,
}

/// Entry point of the `manage` binary.
pub async fn execute_from_command_line() -> Result<()> {
	let cli = Cli::parse();
	let settings = match &cli.settings {
		Some(path) => Settings::load_from(path)?,
		None => Settings::load()?,
	};
	logging::init(&settings, cli.verbosity);

	let mut stdout = std::io::stdout();
	run(cli.command, &settings, &mut stdout).await
}

/// Run a single command against `settings`, writing output to `out`.
pub async fn run(command: Commands, settings: &Settings, out: &mut dyn Write) -> Result<()> {
	match command {
		Commands::Runserver { address } => runserver(settings, address, out).await,
		Commands::Migrate {
			app_label,
			database,
			plan,
		} => {
			let url = database.as_deref().unwrap_or(&settings.database_url);
			migrate(&Database::connect(url).await?, app_label.as_deref(), plan, out).await
		}
		Commands::Showmigrations => show_migrations(&Database::connect(&settings.database_url).await?, out).await,
		Commands::Showurls => show_urls(out),
		Commands::Createquestion { text, days } => {
			let db = Database::connect(&settings.database_url).await?;
			let pub_date = days_from_now(days)?;
			let question = Question::create(&db, text, pub_date).await?;
			writeln!(
				out,
				"Created question {}: {} (published {})",
				question.id.unwrap_or_default(),
				question,
				question.pub_date.to_rfc3339()
			)?;
			Ok(())
		}
		Commands::Addchoice { question_id, text } => {
			let db = Database::connect(&settings.database_url).await?;
			let question = Question::objects(&db).get(question_id).await?;
			let choice = question.create_choice(&db, text).await?;
			writeln!(
				out,
				"Added choice {} to question {}: {}",
				choice.id.unwrap_or_default(),
				question_id,
				choice
			)?;
			Ok(())
		}
		Commands::Check => check(settings, out),
	}
}

async fn runserver(settings: &Settings, address: Option<String>, out: &mut dyn Write) -> Result<()> {
	let address = address.unwrap_or_else(|| settings.bind_address.clone());
	let addr: SocketAddr = address
		.parse()
		.map_err(|_| Error::Configuration(format!("'{}' is not a valid host:port", address)))?;

	let db = Database::connect(&settings.database_url).await?;
	let pending = migrations::plan(&db).await?;
	if !pending.is_empty() {
		warn!(count = pending.len(), "Unapplied migrations");
		writeln!(
			out,
			"You have {} unapplied migration(s). Run 'manage migrate' to apply them.",
			pending.len()
		)?;
	}

	writeln!(out, "Starting development server at http://{}/", addr)?;
	writeln!(out, "Quit the server with CONTROL-C.")?;

	let state = AppState::new(db.clone(), settings.clone());
	let server = HttpServer::new(Arc::new(ProjectHandler::new(state))).with_max_body_size(settings.max_body_size);
	server.listen(addr).await?;
	db.close().await;
	Ok(())
}

async fn migrate(db: &Database, app_label: Option<&str>, plan: bool, out: &mut dyn Write) -> Result<()> {
	let targets: Vec<Migration> = match app_label {
		Some(label) => {
			let app = apps::get_app_config(label)
				.ok_or_else(|| Error::Configuration(format!("No installed app with label '{}'.", label)))?;
			(app.migrations)()
		}
		None => migrations::all_migrations(),
	};

	if plan {
		let pending = migrations::plan_for(db, &targets).await?;
		writeln!(out, "Planned operations:")?;
		if pending.is_empty() {
			writeln!(out, "  No planned migration operations.")?;
		}
		for migration in pending {
			writeln!(out, "  {}", migration.id())?;
		}
		return Ok(());
	}

	writeln!(out, "Running migrations:")?;
	let applied = migrations::apply(db, &targets).await?;
	if applied.is_empty() {
		writeln!(out, "  No migrations to apply.")?;
	}
	for migration in applied {
		writeln!(out, "  Applying {}... OK", migration.id())?;
	}
	Ok(())
}

async fn show_migrations(db: &Database, out: &mut dyn Write) -> Result<()> {
	let mut current_app = None;
	for status in migrations::show_migrations(db).await? {
		if current_app.as_deref() != Some(status.app_label.as_str()) {
			writeln!(out, "{}", status.app_label)?;
			current_app = Some(status.app_label.clone());
		}
		let mark = if status.applied { "X" } else { " " };
		writeln!(out, " [{}] {}", mark, status.name)?;
	}
	Ok(())
}

fn show_urls(out: &mut dyn Write) -> Result<()> {
	for pattern in root_urlconf().patterns() {
		writeln!(out, "/{}\t{}", pattern.route(), pattern.name().unwrap_or("-"))?;
	}
	Ok(())
}

fn check(settings: &Settings, out: &mut dyn Write) -> Result<()> {
	settings.validate()?;
	let apps = apps::installed_apps();
	let routes = root_urlconf().patterns().len();

	writeln!(
		out,
		"Installed apps: {}",
		apps.iter().map(|app| app.label).collect::<Vec<_>>().join(", ")
	)?;
	writeln!(out, "URL patterns: {}", routes)?;
	writeln!(out, "System check identified no issues (0 silenced).")?;
	Ok(())
}
