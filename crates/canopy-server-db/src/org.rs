// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization repository for database operations.
//!
//! This module provides database access for the organization tree:
//! - Bulk hierarchy loading as a revision-tagged snapshot
//! - Direct child lookups
//! - Creation and reparenting, both of which keep the tree acyclic and
//!   single-rooted and bump the hierarchy revision

use async_trait::async_trait;
use canopy_server_auth::{HierarchySnapshot, OrgId, OrgTree, Organization};
use sqlx::{sqlite::SqlitePool, Row, Sqlite, Transaction};

use crate::error::DbError;
use crate::types::{format_timestamp, parse_column, parse_timestamp};

#[async_trait]
pub trait OrgStore: Send + Sync {
	async fn load_hierarchy(&self) -> Result<HierarchySnapshot, DbError>;
	async fn find_children(&self, id: &OrgId) -> Result<Vec<Organization>, DbError>;
	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError>;
	async fn create_org(&self, org: &Organization) -> Result<(), DbError>;
	async fn set_parent(&self, id: &OrgId, parent_id: Option<&OrgId>) -> Result<(), DbError>;
}

/// Repository for organization database operations.
///
/// All IDs are UUIDs stored as strings in SQLite.
#[derive(Clone)]
pub struct OrgRepository {
	pool: SqlitePool,
}

impl OrgRepository {
	/// Create a new repository with the given pool.
	///
	/// # Arguments
	/// * `pool` - SQLite connection pool
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Load every organization together with the current hierarchy revision.
	///
	/// Both reads happen inside one transaction so the revision always
	/// describes exactly the returned rows.
	#[tracing::instrument(skip(self))]
	pub async fn load_hierarchy(&self) -> Result<HierarchySnapshot, DbError> {
		let mut tx = self.pool.begin().await?;
		let snapshot = read_snapshot(&mut tx).await?;
		tx.commit().await?;

		tracing::debug!(
			revision = snapshot.revision,
			organizations = snapshot.organizations.len(),
			"hierarchy loaded"
		);
		Ok(snapshot)
	}

	/// Get the direct children of an organization.
	///
	/// # Returns
	/// An empty list for leaves and for unknown ids.
	#[tracing::instrument(skip(self), fields(org_id = %id))]
	pub async fn find_children(&self, id: &OrgId) -> Result<Vec<Organization>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, name, parent_id, created_at
			FROM organizations
			WHERE parent_id = ?
			ORDER BY rowid
			"#,
		)
		.bind(id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_org).collect()
	}

	/// Get an organization by ID.
	#[tracing::instrument(skip(self), fields(org_id = %id))]
	pub async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, parent_id, created_at
			FROM organizations
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_org).transpose()
	}

	/// Create a new organization.
	///
	/// # Errors
	/// - `DbError::NotFound` if the parent does not exist
	/// - `DbError::Conflict` if the organization would be a second root
	/// - `DbError::Sqlx` if insert fails (e.g., duplicate id)
	#[tracing::instrument(skip(self, org), fields(org_id = %org.id, parent_id = ?org.parent_id))]
	pub async fn create_org(&self, org: &Organization) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;
		let tree = OrgTree::new(read_snapshot(&mut tx).await?);

		match org.parent_id {
			Some(parent_id) if !tree.contains(parent_id) => {
				return Err(DbError::NotFound {
					entity: "organization",
					id: parent_id.to_string(),
				});
			}
			None if !tree.roots().is_empty() => {
				return Err(DbError::Conflict(
					"the organization tree already has a root".to_string(),
				));
			}
			_ => {}
		}

		sqlx::query(
			r#"
			INSERT INTO organizations (id, name, parent_id, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(org.id.to_string())
		.bind(&org.name)
		.bind(org.parent_id.map(|p| p.to_string()))
		.bind(format_timestamp(&org.created_at))
		.execute(&mut *tx)
		.await?;

		bump_revision(&mut tx).await?;
		tx.commit().await?;

		tracing::debug!(org_id = %org.id, "organization created");
		Ok(())
	}

	/// Move an organization under a new parent.
	///
	/// The check and the write share one transaction, so a concurrent reparent
	/// cannot slip a cycle in between.
	///
	/// # Errors
	/// - `DbError::NotFound` if the organization or the new parent is missing
	/// - `DbError::Conflict` if the move would create a cycle or a second root
	#[tracing::instrument(skip(self), fields(org_id = %id, parent_id = ?parent_id))]
	pub async fn set_parent(&self, id: &OrgId, parent_id: Option<&OrgId>) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;
		let tree = OrgTree::new(read_snapshot(&mut tx).await?);

		let Some(current) = tree.get(*id) else {
			return Err(DbError::NotFound {
				entity: "organization",
				id: id.to_string(),
			});
		};

		match parent_id {
			Some(parent_id) => {
				if !tree.contains(*parent_id) {
					return Err(DbError::NotFound {
						entity: "organization",
						id: parent_id.to_string(),
					});
				}
				if parent_id == id || tree.is_descendant(*id, *parent_id) {
					return Err(DbError::Conflict(format!(
						"moving organization {id} under {parent_id} would create a cycle"
					)));
				}
			}
			None => {
				if !current.is_root() && !tree.roots().is_empty() {
					return Err(DbError::Conflict(
						"the organization tree already has a root".to_string(),
					));
				}
			}
		}

		sqlx::query("UPDATE organizations SET parent_id = ? WHERE id = ?")
			.bind(parent_id.map(|p| p.to_string()))
			.bind(id.to_string())
			.execute(&mut *tx)
			.await?;

		bump_revision(&mut tx).await?;
		tx.commit().await?;

		tracing::debug!(org_id = %id, "organization reparented");
		Ok(())
	}
}

#[async_trait]
impl OrgStore for OrgRepository {
	async fn load_hierarchy(&self) -> Result<HierarchySnapshot, DbError> {
		self.load_hierarchy().await
	}

	async fn find_children(&self, id: &OrgId) -> Result<Vec<Organization>, DbError> {
		self.find_children(id).await
	}

	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError> {
		self.get_org_by_id(id).await
	}

	async fn create_org(&self, org: &Organization) -> Result<(), DbError> {
		self.create_org(org).await
	}

	async fn set_parent(&self, id: &OrgId, parent_id: Option<&OrgId>) -> Result<(), DbError> {
		self.set_parent(id, parent_id).await
	}
}

async fn read_snapshot(tx: &mut Transaction<'_, Sqlite>) -> Result<HierarchySnapshot, DbError> {
	let revision: i64 = sqlx::query("SELECT revision FROM hierarchy_revision WHERE id = 1")
		.fetch_optional(&mut **tx)
		.await?
		.map(|row| row.get("revision"))
		.unwrap_or(0);

	let rows = sqlx::query(
		r#"
		SELECT id, name, parent_id, created_at
		FROM organizations
		ORDER BY rowid
		"#,
	)
	.fetch_all(&mut **tx)
	.await?;

	let organizations = rows.iter().map(row_to_org).collect::<Result<Vec<_>, _>>()?;
	Ok(HierarchySnapshot {
		revision,
		organizations,
	})
}

async fn bump_revision(tx: &mut Transaction<'_, Sqlite>) -> Result<(), DbError> {
	sqlx::query("UPDATE hierarchy_revision SET revision = revision + 1 WHERE id = 1")
		.execute(&mut **tx)
		.await?;
	Ok(())
}

pub(crate) fn row_to_org(row: &sqlx::sqlite::SqliteRow) -> Result<Organization, DbError> {
	let id: String = row.get("id");
	let parent_id: Option<String> = row.get("parent_id");
	let created_at: String = row.get("created_at");

	Ok(Organization {
		id: parse_column("organizations", &id)?,
		name: row.get("name"),
		parent_id: parent_id
			.map(|p| parse_column("organizations", &p))
			.transpose()?,
		created_at: parse_timestamp("organizations", &created_at)?,
	})
}
