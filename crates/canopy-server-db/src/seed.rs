// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Demo fixture: the Acme organization tree, one user per role, and a few
//! sample tasks.

use canopy_server_auth::{NewTask, OrgId, Organization, Role, TaskId, TaskStatus, User, UserId};
use sqlx::sqlite::SqlitePool;

use crate::error::DbError;
use crate::org::OrgRepository;
use crate::task::TaskRepository;
use crate::user::UserRepository;

/// Ids of everything [`seed_demo_data`] created.
#[derive(Debug, Clone)]
pub struct SeedSummary {
	pub acme: OrgId,
	pub engineering: OrgId,
	pub sales: OrgId,
	pub frontend: OrgId,
	pub ceo: UserId,
	pub eng_manager: UserId,
	pub dev: UserId,
	pub viewer: UserId,
	pub tasks: Vec<TaskId>,
}

/// Replace all data with the demo fixture.
///
/// Existing tasks, users, and organizations are removed first.
#[tracing::instrument(skip(pool))]
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<SeedSummary, DbError> {
	clear(pool).await?;

	let orgs = OrgRepository::new(pool.clone());
	let users = UserRepository::new(pool.clone());
	let tasks = TaskRepository::new(pool.clone());

	let acme = Organization::new("Acme Corporation", None);
	let engineering = Organization::new("Engineering", Some(acme.id));
	let sales = Organization::new("Sales", Some(acme.id));
	let frontend = Organization::new("Frontend Team", Some(engineering.id));
	for org in [&acme, &engineering, &sales, &frontend] {
		orgs.create_org(org).await?;
	}

	let ceo = User::new("ceo@acme.com", Role::Admin, acme.id);
	let eng_manager = User::new("eng.manager@acme.com", Role::Admin, engineering.id);
	let dev = User::new("dev@acme.com", Role::Owner, frontend.id);
	let viewer = User::new("viewer@acme.com", Role::Viewer, sales.id);
	for user in [&ceo, &eng_manager, &dev, &viewer] {
		users.create_user(user).await?;
	}

	let samples = [
		(
			"Q4 Strategic Planning",
			"Plan company strategy for Q4",
			TaskStatus::InProgress,
			"Planning",
			&ceo,
		),
		(
			"Migrate to Microservices",
			"Break monolith into microservices architecture",
			TaskStatus::Todo,
			"Architecture",
			&eng_manager,
		),
		(
			"Implement Dark Mode",
			"Add dark mode toggle to the dashboard",
			TaskStatus::InProgress,
			"Feature",
			&dev,
		),
		(
			"Review Sales Dashboard",
			"Review and provide feedback on new sales dashboard",
			TaskStatus::Todo,
			"Review",
			&viewer,
		),
		(
			"Update Dependencies",
			"Update dependencies to latest versions",
			TaskStatus::Complete,
			"Maintenance",
			&dev,
		),
	];

	let revision = orgs.load_hierarchy().await?.revision;
	let mut task_ids = Vec::with_capacity(samples.len());
	for (title, description, status, category, owner) in samples {
		let task = NewTask::new(title)
			.with_description(description)
			.with_status(status)
			.with_category(category)
			.into_task(owner.id, owner.organization_id);
		if !tasks.insert(&task, revision).await? {
			return Err(DbError::Internal(
				"organization tree changed while seeding".to_string(),
			));
		}
		task_ids.push(task.id);
	}

	tracing::info!(
		organizations = 4,
		users = 4,
		tasks = task_ids.len(),
		"demo data seeded"
	);

	Ok(SeedSummary {
		acme: acme.id,
		engineering: engineering.id,
		sales: sales.id,
		frontend: frontend.id,
		ceo: ceo.id,
		eng_manager: eng_manager.id,
		dev: dev.id,
		viewer: viewer.id,
		tasks: task_ids,
	})
}

async fn clear(pool: &SqlitePool) -> Result<(), DbError> {
	let mut tx = pool.begin().await?;
	for statement in [
		"DELETE FROM tasks",
		"DELETE FROM users",
		"DELETE FROM organizations",
		"UPDATE hierarchy_revision SET revision = revision + 1 WHERE id = 1",
	] {
		sqlx::query(statement).execute(&mut *tx).await?;
	}
	tx.commit().await?;
	Ok(())
}
