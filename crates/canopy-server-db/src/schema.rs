// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema setup.
//!
//! Every statement is idempotent, so [`run_migrations`] is safe to call on
//! each startup.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const STATEMENTS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS organizations (
		id TEXT PRIMARY KEY NOT NULL,
		name TEXT NOT NULL,
		parent_id TEXT REFERENCES organizations(id),
		created_at TEXT NOT NULL,
		CHECK (parent_id IS NULL OR parent_id != id)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_organizations_parent_id ON organizations(parent_id)",
	r#"
	CREATE TABLE IF NOT EXISTS hierarchy_revision (
		id INTEGER PRIMARY KEY CHECK (id = 1),
		revision INTEGER NOT NULL
	)
	"#,
	"INSERT OR IGNORE INTO hierarchy_revision (id, revision) VALUES (1, 0)",
	r#"
	CREATE TABLE IF NOT EXISTS users (
		id TEXT PRIMARY KEY NOT NULL,
		email TEXT UNIQUE NOT NULL COLLATE NOCASE,
		role TEXT NOT NULL CHECK (role IN ('viewer', 'owner', 'admin')),
		organization_id TEXT NOT NULL REFERENCES organizations(id),
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS tasks (
		id TEXT PRIMARY KEY NOT NULL,
		title TEXT NOT NULL,
		description TEXT,
		status TEXT NOT NULL DEFAULT 'todo' CHECK (status IN ('todo', 'in_progress', 'complete')),
		category TEXT,
		owner_id TEXT NOT NULL REFERENCES users(id),
		organization_id TEXT NOT NULL REFERENCES organizations(id),
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_tasks_org_created ON tasks(organization_id, created_at)",
];

/// Create all tables and indexes if they do not exist.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in STATEMENTS {
		sqlx::query(statement).execute(pool).await?;
	}

	tracing::debug!(statements = STATEMENTS.len(), "schema is up to date");
	Ok(())
}
