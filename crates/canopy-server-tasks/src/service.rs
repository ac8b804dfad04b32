// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorized task operations.
//!
//! Every operation loads the organization tree once, resolves the actor's
//! scope from that snapshot, asks the authorization engine, and only then
//! touches task storage. Mutations are guarded by the hierarchy revision the
//! decision was made against; when the guard misses, the whole sequence is
//! repeated so that the write is always backed by a decision over the tree
//! it lands in.

use std::sync::Arc;

use canopy_server_auth::authz::{
	authorize_create, authorize_delete, authorize_read, authorize_update, create_target, decide,
};
use canopy_server_auth::{
	HierarchyResolver, NewTask, Operation, OrgTree, Task, TaskDetails, TaskId, TaskPatch, User,
};
use canopy_server_config::DEFAULT_MAX_CONFLICT_RETRIES;
use canopy_server_db::{OrgStore, TaskGuard, TaskStore};
use tracing::instrument;

use crate::error::{Result, TaskError};
use crate::validation::{validate_new_task, validate_patch};

/// Entry point for task operations on behalf of an authenticated user.
#[derive(Clone)]
pub struct TaskService {
	orgs: Arc<dyn OrgStore>,
	tasks: Arc<dyn TaskStore>,
	max_conflict_retries: u32,
}

impl std::fmt::Debug for TaskService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TaskService")
			.field("max_conflict_retries", &self.max_conflict_retries)
			.finish_non_exhaustive()
	}
}

impl TaskService {
	pub fn new(orgs: Arc<dyn OrgStore>, tasks: Arc<dyn TaskStore>) -> Self {
		Self {
			orgs,
			tasks,
			max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
		}
	}

	/// Builder: set how many times a guarded write is retried before
	/// [`TaskError::Conflict`] is returned.
	pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
		self.max_conflict_retries = retries;
		self
	}

	pub fn max_conflict_retries(&self) -> u32 {
		self.max_conflict_retries
	}

	async fn load_tree(&self) -> Result<OrgTree> {
		Ok(OrgTree::new(self.orgs.load_hierarchy().await?))
	}

	/// List every task in the actor's home organization or below it, newest
	/// first.
	#[instrument(skip(self, actor), fields(user_id = %actor.id, org_id = %actor.organization_id))]
	pub async fn list_accessible_tasks(&self, actor: &User) -> Result<Vec<TaskDetails>> {
		let tree = self.load_tree().await?;
		let scope = HierarchyResolver::new(&tree).accessible_org_ids(actor);
		decide(actor, &scope, Operation::List, actor.organization_id).into_result()?;

		let tasks = self.tasks.find_by_org_ids(&scope.to_sorted_vec()).await?;
		tracing::debug!(
			count = tasks.len(),
			scope = scope.len(),
			"listed accessible tasks"
		);
		Ok(tasks)
	}

	/// Fetch one task with its owner and organization.
	///
	/// # Errors
	/// - `TaskError::NotFound` if no task has this id
	/// - `TaskError::Forbidden` if the task is outside the actor's scope
	#[instrument(skip(self, actor), fields(user_id = %actor.id, task_id = %id))]
	pub async fn get_task(&self, actor: &User, id: &TaskId) -> Result<TaskDetails> {
		let details = self
			.tasks
			.find_details_by_id(id)
			.await?
			.ok_or(TaskError::NotFound)?;

		let tree = self.load_tree().await?;
		let scope = HierarchyResolver::new(&tree).accessible_org_ids(actor);
		authorize_read(actor, &scope, details.task.organization_id).into_result()?;

		Ok(details)
	}

	/// Create a task owned by the actor.
	///
	/// The task lands in `input.organization_id` when given, otherwise in the
	/// actor's home organization.
	#[instrument(
		skip(self, actor, input),
		fields(user_id = %actor.id, target_org_id = ?input.organization_id)
	)]
	pub async fn create_task(&self, actor: &User, input: NewTask) -> Result<Task> {
		validate_new_task(&input)?;
		let target = create_target(actor, input.organization_id);

		for attempt in 0..=self.max_conflict_retries {
			let tree = self.load_tree().await?;
			let scope = HierarchyResolver::new(&tree).accessible_org_ids(actor);
			authorize_create(actor, &scope, target).into_result()?;

			let task = input.clone().into_task(actor.id, target);
			if self.tasks.insert(&task, tree.revision()).await? {
				tracing::info!(task_id = %task.id, org_id = %target, "task created");
				return Ok(task);
			}

			tracing::warn!(
				attempt,
				revision = tree.revision(),
				"organization tree changed during create, retrying"
			);
		}

		Err(TaskError::Conflict)
	}

	/// Apply `patch` to a task and return its fresh state with relations.
	///
	/// # Errors
	/// - `TaskError::NotFound` if no task has this id, for every role
	/// - `TaskError::Forbidden` if the actor may not modify the task
	/// - `TaskError::Conflict` if the task or tree kept changing
	#[instrument(skip(self, actor, patch), fields(user_id = %actor.id, task_id = %id))]
	pub async fn update_task(
		&self,
		actor: &User,
		id: &TaskId,
		patch: TaskPatch,
	) -> Result<TaskDetails> {
		validate_patch(&patch)?;

		for attempt in 0..=self.max_conflict_retries {
			let existing = self.tasks.find_by_id(id).await?.ok_or(TaskError::NotFound)?;
			let tree = self.load_tree().await?;
			let scope = HierarchyResolver::new(&tree).accessible_org_ids(actor);
			authorize_update(actor, &scope, existing.organization_id).into_result()?;

			let guard = TaskGuard {
				organization_id: existing.organization_id,
				hierarchy_revision: tree.revision(),
			};
			if self.tasks.update_fields(id, &patch, &guard).await? {
				tracing::info!(org_id = %existing.organization_id, "task updated");
				return self
					.tasks
					.find_details_by_id(id)
					.await?
					.ok_or(TaskError::NotFound);
			}

			tracing::warn!(
				attempt,
				revision = tree.revision(),
				"task or organization tree changed during update, retrying"
			);
		}

		Err(TaskError::Conflict)
	}

	/// Delete a task.
	///
	/// # Errors
	/// Same as [`TaskService::update_task`].
	#[instrument(skip(self, actor), fields(user_id = %actor.id, task_id = %id))]
	pub async fn delete_task(&self, actor: &User, id: &TaskId) -> Result<()> {
		for attempt in 0..=self.max_conflict_retries {
			let existing = self.tasks.find_by_id(id).await?.ok_or(TaskError::NotFound)?;
			let tree = self.load_tree().await?;
			let scope = HierarchyResolver::new(&tree).accessible_org_ids(actor);
			authorize_delete(actor, &scope, existing.organization_id).into_result()?;

			let guard = TaskGuard {
				organization_id: existing.organization_id,
				hierarchy_revision: tree.revision(),
			};
			if self.tasks.delete(id, &guard).await? {
				tracing::info!(org_id = %existing.organization_id, "task deleted");
				return Ok(());
			}

			tracing::warn!(
				attempt,
				revision = tree.revision(),
				"task or organization tree changed during delete, retrying"
			);
		}

		Err(TaskError::Conflict)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use canopy_server_auth::{DenyReason, OrgId, Role, TaskStatus};
	use canopy_server_db::testing::create_test_pool;
	use canopy_server_db::{
		seed_demo_data, DbError, OrgRepository, SeedSummary, TaskRepository, UserRepository,
	};
	use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

	type StoreResult<T> = std::result::Result<T, DbError>;

	struct Fixture {
		service: TaskService,
		orgs: OrgRepository,
		tasks: TaskRepository,
		seed: SeedSummary,
		ceo: User,
		eng_manager: User,
		dev: User,
		viewer: User,
	}

	async fn setup() -> Fixture {
		let pool = create_test_pool().await.unwrap();
		let seed = seed_demo_data(&pool).await.unwrap();
		let users = UserRepository::new(pool.clone());
		let load = |id| {
			let users = users.clone();
			async move { users.get_user_by_id(&id).await.unwrap().unwrap() }
		};

		let orgs = OrgRepository::new(pool.clone());
		let tasks = TaskRepository::new(pool);
		Fixture {
			service: TaskService::new(Arc::new(orgs.clone()), Arc::new(tasks.clone())),
			ceo: load(seed.ceo).await,
			eng_manager: load(seed.eng_manager).await,
			dev: load(seed.dev).await,
			viewer: load(seed.viewer).await,
			orgs,
			tasks,
			seed,
		}
	}

	async fn task_in(fx: &Fixture, org: OrgId) -> Task {
		fx.service
			.create_task(&fx.ceo, NewTask::new("Fixture task").in_org(org))
			.await
			.unwrap()
	}

	mod list {
		use super::*;

		#[tokio::test]
		async fn root_admin_sees_everything() {
			let fx = setup().await;
			let tasks = fx.service.list_accessible_tasks(&fx.ceo).await.unwrap();
			assert_eq!(tasks.len(), 5);
		}

		#[tokio::test]
		async fn viewer_sees_own_subtree_only() {
			let fx = setup().await;
			let tasks = fx.service.list_accessible_tasks(&fx.viewer).await.unwrap();
			assert_eq!(tasks.len(), 1);
			assert!(tasks
				.iter()
				.all(|t| t.task.organization_id == fx.seed.sales));
		}

		#[tokio::test]
		async fn newest_first() {
			let fx = setup().await;
			let newest = task_in(&fx, fx.seed.engineering).await;

			let tasks = fx
				.service
				.list_accessible_tasks(&fx.eng_manager)
				.await
				.unwrap();
			assert_eq!(tasks[0].task.id, newest.id);
			assert!(tasks
				.windows(2)
				.all(|w| w[0].task.created_at >= w[1].task.created_at));
		}
	}

	mod read {
		use super::*;

		#[tokio::test]
		async fn ancestor_admin_can_read_descendant_task() {
			let fx = setup().await;
			let task = task_in(&fx, fx.seed.frontend).await;
			let details = fx.service.get_task(&fx.eng_manager, &task.id).await.unwrap();
			assert_eq!(details.task.id, task.id);
			assert_eq!(details.owner.email, "ceo@acme.com");
			assert_eq!(details.organization.name, "Frontend Team");
		}

		#[tokio::test]
		async fn sibling_task_is_forbidden() {
			let fx = setup().await;
			let task = task_in(&fx, fx.seed.sales).await;
			let err = fx.service.get_task(&fx.dev, &task.id).await.unwrap_err();
			assert_eq!(err.deny_reason(), Some(DenyReason::TaskNotAccessible));
		}

		#[tokio::test]
		async fn missing_task_is_not_found() {
			let fx = setup().await;
			let err = fx
				.service
				.get_task(&fx.ceo, &TaskId::generate())
				.await
				.unwrap_err();
			assert!(matches!(err, TaskError::NotFound));
		}
	}

	mod create {
		use super::*;

		#[tokio::test]
		async fn defaults_to_home_org() {
			let fx = setup().await;
			let task = fx
				.service
				.create_task(&fx.dev, NewTask::new("Polish buttons"))
				.await
				.unwrap();
			assert_eq!(task.organization_id, fx.seed.frontend);
			assert_eq!(task.owner_id, fx.dev.id);
			assert_eq!(task.status, TaskStatus::Todo);
		}

		#[tokio::test]
		async fn owner_may_name_home_org_explicitly() {
			let fx = setup().await;
			let task = fx
				.service
				.create_task(&fx.dev, NewTask::new("Explicit").in_org(fx.seed.frontend))
				.await
				.unwrap();
			assert_eq!(task.organization_id, fx.seed.frontend);
		}

		#[tokio::test]
		async fn owner_cannot_create_elsewhere() {
			let fx = setup().await;
			let err = fx
				.service
				.create_task(&fx.dev, NewTask::new("Nope").in_org(fx.seed.sales))
				.await
				.unwrap_err();
			assert_eq!(
				err.to_string(),
				"only admins can create tasks in other organizations"
			);
		}

		#[tokio::test]
		async fn invalid_input_checked_before_role() {
			let fx = setup().await;
			let err = fx
				.service
				.create_task(&fx.viewer, NewTask::new("  "))
				.await
				.unwrap_err();
			assert!(matches!(err, TaskError::InvalidInput(_)));
		}

		#[tokio::test]
		async fn unknown_target_org_is_not_accessible() {
			let fx = setup().await;
			let err = fx
				.service
				.create_task(&fx.ceo, NewTask::new("Lost").in_org(OrgId::generate()))
				.await
				.unwrap_err();
			assert_eq!(err.deny_reason(), Some(DenyReason::OrgNotAccessible));
		}
	}

	mod mutate {
		use super::*;

		#[tokio::test]
		async fn owner_updates_any_task_in_home_org() {
			let fx = setup().await;
			let task = fx
				.service
				.create_task(&fx.ceo, NewTask::new("Someone else's").in_org(fx.seed.frontend))
				.await
				.unwrap();

			let patch = TaskPatch {
				status: Some(TaskStatus::Complete),
				..Default::default()
			};
			let updated = fx.service.update_task(&fx.dev, &task.id, patch).await.unwrap();
			assert_eq!(updated.task.status, TaskStatus::Complete);
			assert_eq!(updated.task.organization_id, fx.seed.frontend);
			assert_eq!(updated.owner.id, fx.ceo.id);
			assert!(updated.task.updated_at >= task.updated_at);
		}

		#[tokio::test]
		async fn viewer_cannot_update_in_home_org() {
			let fx = setup().await;
			let task = task_in(&fx, fx.seed.sales).await;
			let patch = TaskPatch {
				title: Some("Renamed".to_string()),
				..Default::default()
			};
			let err = fx
				.service
				.update_task(&fx.viewer, &task.id, patch)
				.await
				.unwrap_err();
			assert_eq!(err.to_string(), "viewers cannot update tasks");
		}

		#[tokio::test]
		async fn admin_deletes_descendant_task() {
			let fx = setup().await;
			let task = task_in(&fx, fx.seed.frontend).await;
			fx.service
				.delete_task(&fx.eng_manager, &task.id)
				.await
				.unwrap();
			assert!(fx.tasks.find_by_id(&task.id).await.unwrap().is_none());
		}

		#[tokio::test]
		async fn admin_cannot_delete_ancestor_task() {
			let fx = setup().await;
			let task = task_in(&fx, fx.seed.acme).await;
			let err = fx
				.service
				.delete_task(&fx.eng_manager, &task.id)
				.await
				.unwrap_err();
			assert_eq!(err.deny_reason(), Some(DenyReason::TaskNotAccessible));
			assert!(fx.tasks.find_by_id(&task.id).await.unwrap().is_some());
		}

		#[tokio::test]
		async fn missing_task_is_not_found_for_viewer() {
			let fx = setup().await;
			let err = fx
				.service
				.update_task(&fx.viewer, &TaskId::generate(), TaskPatch::default())
				.await
				.unwrap_err();
			assert!(matches!(err, TaskError::NotFound));
		}
	}

	mod concurrency {
		use super::*;
		use canopy_server_config::AuthzConfig;

		#[tokio::test]
		async fn default_retries_match_configuration_default() {
			let fx = setup().await;
			assert_eq!(
				fx.service.max_conflict_retries(),
				AuthzConfig::default().max_conflict_retries
			);
		}

		/// Delegates reads and reports every guarded write as stale.
		struct AlwaysStale {
			inner: TaskRepository,
			writes: AtomicU32,
		}

		#[async_trait]
		impl TaskStore for AlwaysStale {
			async fn find_by_id(&self, id: &TaskId) -> StoreResult<Option<Task>> {
				self.inner.find_by_id(id).await
			}

			async fn find_details_by_id(&self, id: &TaskId) -> StoreResult<Option<TaskDetails>> {
				self.inner.find_details_by_id(id).await
			}

			async fn find_by_org_ids(&self, org_ids: &[OrgId]) -> StoreResult<Vec<TaskDetails>> {
				self.inner.find_by_org_ids(org_ids).await
			}

			async fn insert(&self, _task: &Task, _rev: i64) -> StoreResult<bool> {
				self.writes.fetch_add(1, Ordering::SeqCst);
				Ok(false)
			}

			async fn update_fields(
				&self,
				_id: &TaskId,
				_patch: &TaskPatch,
				_guard: &TaskGuard,
			) -> StoreResult<bool> {
				self.writes.fetch_add(1, Ordering::SeqCst);
				Ok(false)
			}

			async fn delete(&self, _id: &TaskId, _guard: &TaskGuard) -> StoreResult<bool> {
				self.writes.fetch_add(1, Ordering::SeqCst);
				Ok(false)
			}
		}

		/// Moves one organization under another right before the first write,
		/// simulating a reparent that races the authorization check.
		struct ReparentBeforeFirstWrite {
			inner: TaskRepository,
			orgs: OrgRepository,
			org: OrgId,
			new_parent: OrgId,
			fired: AtomicBool,
		}

		impl ReparentBeforeFirstWrite {
			async fn race(&self) -> StoreResult<()> {
				if !self.fired.swap(true, Ordering::SeqCst) {
					self.orgs.set_parent(&self.org, Some(&self.new_parent)).await?;
				}
				Ok(())
			}
		}

		#[async_trait]
		impl TaskStore for ReparentBeforeFirstWrite {
			async fn find_by_id(&self, id: &TaskId) -> StoreResult<Option<Task>> {
				self.inner.find_by_id(id).await
			}

			async fn find_details_by_id(&self, id: &TaskId) -> StoreResult<Option<TaskDetails>> {
				self.inner.find_details_by_id(id).await
			}

			async fn find_by_org_ids(&self, org_ids: &[OrgId]) -> StoreResult<Vec<TaskDetails>> {
				self.inner.find_by_org_ids(org_ids).await
			}

			async fn insert(&self, task: &Task, rev: i64) -> StoreResult<bool> {
				self.race().await?;
				self.inner.insert(task, rev).await
			}

			async fn update_fields(
				&self,
				id: &TaskId,
				patch: &TaskPatch,
				guard: &TaskGuard,
			) -> StoreResult<bool> {
				self.race().await?;
				self.inner.update_fields(id, patch, guard).await
			}

			async fn delete(&self, id: &TaskId, guard: &TaskGuard) -> StoreResult<bool> {
				self.race().await?;
				self.inner.delete(id, guard).await
			}
		}

		#[tokio::test]
		async fn persistent_contention_is_conflict() {
			let fx = setup().await;
			let task = task_in(&fx, fx.seed.frontend).await;
			let store = Arc::new(AlwaysStale {
				inner: fx.tasks.clone(),
				writes: AtomicU32::new(0),
			});
			let service = TaskService::new(Arc::new(fx.orgs.clone()), store.clone())
				.with_max_conflict_retries(2);

			let err = service.delete_task(&fx.dev, &task.id).await.unwrap_err();
			assert!(matches!(err, TaskError::Conflict));
			assert_eq!(store.writes.load(Ordering::SeqCst), 3);
			assert!(fx.tasks.find_by_id(&task.id).await.unwrap().is_some());
		}

		#[tokio::test]
		async fn zero_retries_tries_once() {
			let fx = setup().await;
			let store = Arc::new(AlwaysStale {
				inner: fx.tasks.clone(),
				writes: AtomicU32::new(0),
			});
			let service = TaskService::new(Arc::new(fx.orgs.clone()), store.clone())
				.with_max_conflict_retries(0);

			let err = service
				.create_task(&fx.dev, NewTask::new("Once"))
				.await
				.unwrap_err();
			assert!(matches!(err, TaskError::Conflict));
			assert_eq!(store.writes.load(Ordering::SeqCst), 1);
		}

		#[tokio::test]
		async fn racing_reparent_revokes_access_before_write() {
			let fx = setup().await;
			let task = task_in(&fx, fx.seed.frontend).await;
			let store = Arc::new(ReparentBeforeFirstWrite {
				inner: fx.tasks.clone(),
				orgs: fx.orgs.clone(),
				org: fx.seed.frontend,
				new_parent: fx.seed.sales,
				fired: AtomicBool::new(false),
			});
			let service = TaskService::new(Arc::new(fx.orgs.clone()), store);

			let err = service
				.delete_task(&fx.eng_manager, &task.id)
				.await
				.unwrap_err();
			assert_eq!(err.deny_reason(), Some(DenyReason::TaskNotAccessible));
			assert!(fx.tasks.find_by_id(&task.id).await.unwrap().is_some());
		}

		#[tokio::test]
		async fn racing_reparent_that_keeps_access_succeeds_on_retry() {
			let fx = setup().await;
			let store = Arc::new(ReparentBeforeFirstWrite {
				inner: fx.tasks.clone(),
				orgs: fx.orgs.clone(),
				org: fx.seed.frontend,
				new_parent: fx.seed.sales,
				fired: AtomicBool::new(false),
			});
			let service = TaskService::new(Arc::new(fx.orgs.clone()), store);

			let task = service
				.create_task(&fx.ceo, NewTask::new("Still reachable").in_org(fx.seed.frontend))
				.await
				.unwrap();
			assert_eq!(task.organization_id, fx.seed.frontend);
			assert!(fx.tasks.find_by_id(&task.id).await.unwrap().is_some());
		}
	}

	#[tokio::test]
	async fn user_lookup_roles_match_fixture() {
		let fx = setup().await;
		assert_eq!(fx.ceo.role, Role::Admin);
		assert_eq!(fx.dev.role, Role::Owner);
		assert_eq!(fx.viewer.role, Role::Viewer);
		assert_eq!(fx.eng_manager.organization_id, fx.seed.engineering);
	}
}
