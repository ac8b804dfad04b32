// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User repository.
//!
//! Users are provisioned outside the task service; this store exists for
//! seeding and for resolving the acting user by email at the CLI boundary.

use async_trait::async_trait;
use canopy_server_auth::{OrgId, User, UserId};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{format_timestamp, parse_column, parse_timestamp};

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, user: &User) -> Result<(), DbError>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError>;
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
	async fn list_users(&self) -> Result<Vec<User>, DbError>;
}

#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a user.
	///
	/// # Errors
	/// - `DbError::NotFound` if the home organization does not exist
	/// - `DbError::Conflict` if the email is already taken
	#[tracing::instrument(
		skip(self, user),
		fields(user_id = %user.id, org_id = %user.organization_id)
	)]
	pub async fn create_user(&self, user: &User) -> Result<(), DbError> {
		if !self.org_exists(&user.organization_id).await? {
			return Err(DbError::NotFound {
				entity: "organization",
				id: user.organization_id.to_string(),
			});
		}

		let result = sqlx::query(
			r#"
			INSERT INTO users (id, email, role, organization_id, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(user.id.to_string())
		.bind(&user.email)
		.bind(user.role.to_string())
		.bind(user.organization_id.to_string())
		.bind(format_timestamp(&user.created_at))
		.execute(&self.pool)
		.await;

		match result {
			Ok(_) => Ok(()),
			Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(DbError::Conflict(
				format!("a user with email {} already exists", user.email),
			)),
			Err(e) => Err(e.into()),
		}
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, role, organization_id, created_at
			FROM users
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_user).transpose()
	}

	/// Look up a user by email, ignoring case.
	#[tracing::instrument(skip(self))]
	pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, role, organization_id, created_at
			FROM users
			WHERE email = ? COLLATE NOCASE
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_user).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_users(&self) -> Result<Vec<User>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, email, role, organization_id, created_at
			FROM users
			ORDER BY email
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_user).collect()
	}

	async fn org_exists(&self, id: &OrgId) -> Result<bool, DbError> {
		let row = sqlx::query("SELECT 1 FROM organizations WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.is_some())
	}
}

#[async_trait]
impl UserStore for UserRepository {
	async fn create_user(&self, user: &User) -> Result<(), DbError> {
		self.create_user(user).await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		self.get_user_by_id(id).await
	}

	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		self.get_user_by_email(email).await
	}

	async fn list_users(&self) -> Result<Vec<User>, DbError> {
		self.list_users().await
	}
}

pub(crate) fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
	let id: String = row.get("id");
	let role: String = row.get("role");
	let organization_id: String = row.get("organization_id");
	let created_at: String = row.get("created_at");

	Ok(User {
		id: parse_column("users", &id)?,
		email: row.get("email"),
		role: parse_column("users", &role)?,
		organization_id: parse_column("users", &organization_id)?,
		created_at: parse_timestamp("users", &created_at)?,
	})
}
