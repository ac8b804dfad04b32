// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Task repository for database operations.
//!
//! Reads return tasks joined with their owner and organization. Writes are
//! conditional: each one carries the hierarchy revision the caller authorized
//! against, and a write whose condition no longer holds affects no rows
//! instead of failing. Callers treat `false` as "re-read and try again".

use async_trait::async_trait;
use canopy_server_auth::{
	OrgId, Organization, Task, TaskDetails, TaskId, TaskPatch, UserSummary,
};
use chrono::{SubsecRound, Utc};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{format_timestamp, parse_column, parse_timestamp};

/// The facts an authorization decision for an existing task relied on.
///
/// A guarded write only lands if the task is still in `organization_id` and
/// the organization tree is still at `hierarchy_revision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskGuard {
	pub organization_id: OrgId,
	pub hierarchy_revision: i64,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
	async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, DbError>;
	async fn find_details_by_id(&self, id: &TaskId) -> Result<Option<TaskDetails>, DbError>;
	async fn find_by_org_ids(&self, org_ids: &[OrgId]) -> Result<Vec<TaskDetails>, DbError>;
	async fn insert(&self, task: &Task, expected_revision: i64) -> Result<bool, DbError>;
	async fn update_fields(
		&self,
		id: &TaskId,
		patch: &TaskPatch,
		guard: &TaskGuard,
	) -> Result<bool, DbError>;
	async fn delete(&self, id: &TaskId, guard: &TaskGuard) -> Result<bool, DbError>;
}

const DETAILS_SELECT: &str = r#"
	SELECT
		t.id, t.title, t.description, t.status, t.category,
		t.owner_id, t.organization_id, t.created_at, t.updated_at,
		u.email AS owner_email, u.role AS owner_role,
		o.name AS org_name, o.parent_id AS org_parent_id, o.created_at AS org_created_at
	FROM tasks t
	JOIN users u ON u.id = t.owner_id
	JOIN organizations o ON o.id = t.organization_id
"#;

const REVISION_MATCHES: &str = "(SELECT revision FROM hierarchy_revision WHERE id = 1) = ?";

/// Repository for task database operations.
#[derive(Clone)]
pub struct TaskRepository {
	pool: SqlitePool,
}

impl TaskRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self), fields(task_id = %id))]
	pub async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, title, description, status, category,
				owner_id, organization_id, created_at, updated_at
			FROM tasks
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_task).transpose()
	}

	#[tracing::instrument(skip(self), fields(task_id = %id))]
	pub async fn find_details_by_id(&self, id: &TaskId) -> Result<Option<TaskDetails>, DbError> {
		let sql = format!("{DETAILS_SELECT} WHERE t.id = ?");
		let row = sqlx::query(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.as_ref().map(row_to_details).transpose()
	}

	/// List tasks in any of the given organizations, newest first.
	///
	/// Ties on `created_at` fall back to insertion order, newest first. An
	/// empty id list returns an empty result without querying. The ids are
	/// bound as one JSON array, so the size of the set is not limited by the
	/// number of SQL variables.
	#[tracing::instrument(skip(self, org_ids), fields(org_count = org_ids.len()))]
	pub async fn find_by_org_ids(&self, org_ids: &[OrgId]) -> Result<Vec<TaskDetails>, DbError> {
		if org_ids.is_empty() {
			return Ok(Vec::new());
		}

		let ids: Vec<String> = org_ids.iter().map(ToString::to_string).collect();
		let ids = serde_json::to_string(&ids)
			.map_err(|e| DbError::Internal(format!("encoding organization ids: {e}")))?;

		let sql = format!(
			"{DETAILS_SELECT} WHERE t.organization_id IN (SELECT value FROM json_each(?)) \
			 ORDER BY t.created_at DESC, t.rowid DESC"
		);
		let rows = sqlx::query(&sql).bind(ids).fetch_all(&self.pool).await?;
		let tasks = rows.iter().map(row_to_details).collect::<Result<Vec<_>, _>>()?;

		tracing::debug!(count = tasks.len(), "tasks listed");
		Ok(tasks)
	}

	/// Insert a task if the hierarchy is still at `expected_revision`.
	///
	/// # Returns
	/// `true` if the row was written, `false` if the hierarchy moved on.
	#[tracing::instrument(
		skip(self, task),
		fields(task_id = %task.id, org_id = %task.organization_id)
	)]
	pub async fn insert(&self, task: &Task, expected_revision: i64) -> Result<bool, DbError> {
		let sql = format!(
			r#"
			INSERT INTO tasks (id, title, description, status, category,
				owner_id, organization_id, created_at, updated_at)
			SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?
			WHERE {REVISION_MATCHES}
			"#
		);
		let result = sqlx::query(&sql)
			.bind(task.id.to_string())
			.bind(&task.title)
			.bind(&task.description)
			.bind(task.status.to_string())
			.bind(&task.category)
			.bind(task.owner_id.to_string())
			.bind(task.organization_id.to_string())
			.bind(format_timestamp(&task.created_at))
			.bind(format_timestamp(&task.updated_at))
			.bind(expected_revision)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() == 1)
	}

	/// Apply a partial update under `guard`.
	///
	/// Fields absent from the patch keep their stored value. `updated_at` is
	/// always refreshed.
	///
	/// # Returns
	/// `true` if the row was written, `false` if the task is gone, moved
	/// organization, or the hierarchy moved on.
	#[tracing::instrument(
		skip(self, patch),
		fields(task_id = %id, org_id = %guard.organization_id, revision = guard.hierarchy_revision)
	)]
	pub async fn update_fields(
		&self,
		id: &TaskId,
		patch: &TaskPatch,
		guard: &TaskGuard,
	) -> Result<bool, DbError> {
		let sql = format!(
			r#"
			UPDATE tasks SET
				title = COALESCE(?, title),
				description = COALESCE(?, description),
				status = COALESCE(?, status),
				category = COALESCE(?, category),
				updated_at = ?
			WHERE id = ? AND organization_id = ? AND {REVISION_MATCHES}
			"#
		);
		let now = Utc::now().trunc_subsecs(6);
		let result = sqlx::query(&sql)
			.bind(&patch.title)
			.bind(&patch.description)
			.bind(patch.status.map(|s| s.to_string()))
			.bind(&patch.category)
			.bind(format_timestamp(&now))
			.bind(id.to_string())
			.bind(guard.organization_id.to_string())
			.bind(guard.hierarchy_revision)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() == 1)
	}

	/// Delete a task under `guard`.
	#[tracing::instrument(
		skip(self),
		fields(task_id = %id, org_id = %guard.organization_id, revision = guard.hierarchy_revision)
	)]
	pub async fn delete(&self, id: &TaskId, guard: &TaskGuard) -> Result<bool, DbError> {
		let sql = format!(
			"DELETE FROM tasks WHERE id = ? AND organization_id = ? AND {REVISION_MATCHES}"
		);
		let result = sqlx::query(&sql)
			.bind(id.to_string())
			.bind(guard.organization_id.to_string())
			.bind(guard.hierarchy_revision)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() == 1)
	}
}

#[async_trait]
impl TaskStore for TaskRepository {
	async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, DbError> {
		self.find_by_id(id).await
	}

	async fn find_details_by_id(&self, id: &TaskId) -> Result<Option<TaskDetails>, DbError> {
		self.find_details_by_id(id).await
	}

	async fn find_by_org_ids(&self, org_ids: &[OrgId]) -> Result<Vec<TaskDetails>, DbError> {
		self.find_by_org_ids(org_ids).await
	}

	async fn insert(&self, task: &Task, expected_revision: i64) -> Result<bool, DbError> {
		self.insert(task, expected_revision).await
	}

	async fn update_fields(
		&self,
		id: &TaskId,
		patch: &TaskPatch,
		guard: &TaskGuard,
	) -> Result<bool, DbError> {
		self.update_fields(id, patch, guard).await
	}

	async fn delete(&self, id: &TaskId, guard: &TaskGuard) -> Result<bool, DbError> {
		self.delete(id, guard).await
	}
}

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, DbError> {
	let id: String = row.get("id");
	let status: String = row.get("status");
	let owner_id: String = row.get("owner_id");
	let organization_id: String = row.get("organization_id");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(Task {
		id: parse_column("tasks", &id)?,
		title: row.get("title"),
		description: row.get("description"),
		status: parse_column("tasks", &status)?,
		category: row.get("category"),
		owner_id: parse_column("tasks", &owner_id)?,
		organization_id: parse_column("tasks", &organization_id)?,
		created_at: parse_timestamp("tasks", &created_at)?,
		updated_at: parse_timestamp("tasks", &updated_at)?,
	})
}

fn row_to_details(row: &sqlx::sqlite::SqliteRow) -> Result<TaskDetails, DbError> {
	let task = row_to_task(row)?;

	let owner_role: String = row.get("owner_role");
	let owner = UserSummary {
		id: task.owner_id,
		email: row.get("owner_email"),
		role: parse_column("users", &owner_role)?,
	};

	let org_parent_id: Option<String> = row.get("org_parent_id");
	let org_created_at: String = row.get("org_created_at");
	let organization = Organization {
		id: task.organization_id,
		name: row.get("org_name"),
		parent_id: org_parent_id
			.map(|p| parse_column("organizations", &p))
			.transpose()?,
		created_at: parse_timestamp("organizations", &org_created_at)?,
	};

	Ok(TaskDetails {
		task,
		owner,
		organization,
	})
}
