// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Canopy command-line binary.
//!
//! Every command prints JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use canopy_server_auth::{NewTask, OrgId, OrgTree, TaskId, TaskPatch, TaskStatus, User};
use canopy_server_config::{LogFormat, ServerConfig};
use canopy_server_db::{
	create_pool, run_migrations, seed_demo_data, OrgRepository, TaskRepository, UserRepository,
};
use canopy_server_tasks::TaskService;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod orgs;
mod version;

/// Canopy - hierarchical task authorization.
#[derive(Parser, Debug)]
#[command(name = "canopy", about = "Hierarchical task authorization", version)]
struct Args {
	/// Config file to use instead of /etc/canopy/server.toml
	#[arg(long, global = true, env = "CANOPY_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
	/// Create tables if they do not exist
	Migrate,
	/// Replace all data with the Acme demo fixture
	Seed,
	/// Inspect the organization tree
	#[command(subcommand)]
	Orgs(OrgsCommand),
	/// Task operations on behalf of a user
	#[command(subcommand)]
	Tasks(TasksCommand),
}

#[derive(Subcommand, Debug)]
enum OrgsCommand {
	/// Print the organization tree
	Tree,
	/// Check the tree for cycles, orphans, and extra roots
	Check,
}

#[derive(ClapArgs, Debug)]
struct Actor {
	/// Email of the acting user
	#[arg(long = "as", value_name = "EMAIL")]
	email: String,
}

#[derive(Subcommand, Debug)]
enum TasksCommand {
	/// List tasks visible to the user, newest first
	List {
		#[command(flatten)]
		actor: Actor,
	},
	/// Show one task
	Get {
		#[command(flatten)]
		actor: Actor,
		id: TaskId,
	},
	/// Create a task owned by the user
	Create {
		#[command(flatten)]
		actor: Actor,
		#[arg(long)]
		title: String,
		#[arg(long)]
		description: Option<String>,
		#[arg(long)]
		category: Option<String>,
		#[arg(long)]
		status: Option<TaskStatus>,
		/// Target organization; defaults to the user's home organization
		#[arg(long)]
		org: Option<OrgId>,
	},
	/// Change fields of a task
	Update {
		#[command(flatten)]
		actor: Actor,
		id: TaskId,
		#[arg(long)]
		title: Option<String>,
		#[arg(long)]
		description: Option<String>,
		#[arg(long)]
		category: Option<String>,
		#[arg(long)]
		status: Option<TaskStatus>,
	},
	/// Delete a task
	Delete {
		#[command(flatten)]
		actor: Actor,
		id: TaskId,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Command::Version = args.command {
		return print_json(&version::BuildInfo::current());
	}

	dotenvy::dotenv().ok();

	let config = load_configuration(args.config.as_deref(), std::io::stderr)?;
	init_tracing(&config);

	let pool = create_pool(&config.database.url)
		.await
		.with_context(|| format!("failed to open database {}", config.database.url))?;

	match args.command {
		Command::Version => print_json(&version::BuildInfo::current()),
		Command::Migrate => {
			run_migrations(&pool).await?;
			tracing::info!("migrations applied");
			print_json(&serde_json::json!({ "migrated": true }))
		}
		Command::Seed => {
			run_migrations(&pool).await?;
			let summary = seed_demo_data(&pool).await?;
			print_json(&serde_json::json!({
				"organizations": {
					"acme": summary.acme,
					"engineering": summary.engineering,
					"sales": summary.sales,
					"frontend": summary.frontend,
				},
				"tasks": summary.tasks,
			}))
		}
		Command::Orgs(command) => run_orgs(&pool, command).await,
		Command::Tasks(command) => run_tasks(&pool, &config, command).await,
	}
}

/// Loads configuration under a temporary subscriber, since the configured
/// one cannot exist until loading has finished.
fn load_configuration<W>(path: Option<&Path>, writer: W) -> anyhow::Result<ServerConfig>
where
	W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let bootstrap = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(writer)
		.finish();

	tracing::subscriber::with_default(bootstrap, || match path {
		Some(path) => canopy_server_config::load_config_with_file(path),
		None => canopy_server_config::load_config(),
	})
	.context("failed to load configuration")
}

fn init_tracing(config: &ServerConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());

	let (pretty, json) = match config.logging.format {
		LogFormat::Pretty => (
			Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
			None,
		),
		LogFormat::Json => (
			None,
			Some(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(std::io::stderr),
			),
		),
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(pretty)
		.with(json)
		.init();
}

async fn run_orgs(pool: &SqlitePool, command: OrgsCommand) -> anyhow::Result<()> {
	let snapshot = OrgRepository::new(pool.clone()).load_hierarchy().await?;
	let tree = OrgTree::new(snapshot);

	match command {
		OrgsCommand::Tree => print_json(&orgs::render_tree(&tree)),
		OrgsCommand::Check => {
			let report = orgs::integrity_report(&tree);
			print_json(&report)?;
			if !report.healthy {
				anyhow::bail!("organization tree failed integrity check");
			}
			Ok(())
		}
	}
}

async fn run_tasks(
	pool: &SqlitePool,
	config: &ServerConfig,
	command: TasksCommand,
) -> anyhow::Result<()> {
	let users = UserRepository::new(pool.clone());
	let service = TaskService::new(
		Arc::new(OrgRepository::new(pool.clone())),
		Arc::new(TaskRepository::new(pool.clone())),
	)
	.with_max_conflict_retries(config.authz.max_conflict_retries);

	match command {
		TasksCommand::List { actor } => {
			let user = resolve_actor(&users, &actor).await?;
			print_json(&service.list_accessible_tasks(&user).await?)
		}
		TasksCommand::Get { actor, id } => {
			let user = resolve_actor(&users, &actor).await?;
			print_json(&service.get_task(&user, &id).await?)
		}
		TasksCommand::Create {
			actor,
			title,
			description,
			category,
			status,
			org,
		} => {
			let user = resolve_actor(&users, &actor).await?;
			let input = NewTask {
				title,
				description,
				status,
				category,
				organization_id: org,
			};
			print_json(&service.create_task(&user, input).await?)
		}
		TasksCommand::Update {
			actor,
			id,
			title,
			description,
			category,
			status,
		} => {
			let user = resolve_actor(&users, &actor).await?;
			let patch = TaskPatch {
				title,
				description,
				status,
				category,
			};
			print_json(&service.update_task(&user, &id, patch).await?)
		}
		TasksCommand::Delete { actor, id } => {
			let user = resolve_actor(&users, &actor).await?;
			service.delete_task(&user, &id).await?;
			print_json(&serde_json::json!({ "deleted": id }))
		}
	}
}

async fn resolve_actor(users: &UserRepository, actor: &Actor) -> anyhow::Result<User> {
	users
		.get_user_by_email(&actor.email)
		.await?
		.ok_or_else(|| anyhow!("unknown user {}", actor.email))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}
