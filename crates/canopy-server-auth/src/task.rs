// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Task entity and the create/update payloads accepted by the task service.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::org::Organization;
use crate::types::{OrgId, TaskId, TaskStatus, UserId};
use crate::user::UserSummary;

/// A unit of work scoped to one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
	pub id: TaskId,
	pub title: String,
	pub description: Option<String>,
	pub status: TaskStatus,
	pub category: Option<String>,

	/// The user who created the task.
	pub owner_id: UserId,

	/// The organization the task is scoped to. Never changed after creation.
	pub organization_id: OrgId,

	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// A task together with its owner and organization relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
	#[serde(flatten)]
	pub task: Task,
	pub owner: UserSummary,
	pub organization: Organization,
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub status: Option<TaskStatus>,
	#[serde(default)]
	pub category: Option<String>,
	/// Target organization; defaults to the creator's home organization.
	#[serde(default)]
	pub organization_id: Option<OrgId>,
}

impl NewTask {
	pub fn new(title: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			..Default::default()
		}
	}

	/// Builder: set the target organization.
	pub fn in_org(mut self, org_id: OrgId) -> Self {
		self.organization_id = Some(org_id);
		self
	}

	/// Builder: set the description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	/// Builder: set the category.
	pub fn with_category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	/// Builder: set the initial status.
	pub fn with_status(mut self, status: TaskStatus) -> Self {
		self.status = Some(status);
		self
	}

	/// Materializes the task as created by `owner_id` in `organization_id`.
	pub fn into_task(self, owner_id: UserId, organization_id: OrgId) -> Task {
		// Storage keeps microsecond precision.
		let now = Utc::now().trunc_subsecs(6);
		Task {
			id: TaskId::generate(),
			title: self.title,
			description: self.description,
			status: self.status.unwrap_or_default(),
			category: self.category,
			owner_id,
			organization_id,
			created_at: now,
			updated_at: now,
		}
	}
}

/// Partial update of a task's mutable fields.
///
/// The organization is deliberately absent: tasks never move between
/// organizations through the update path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub status: Option<TaskStatus>,
	#[serde(default)]
	pub category: Option<String>,
}

impl TaskPatch {
	/// Returns true if the patch changes nothing.
	pub fn is_empty(&self) -> bool {
		self.title.is_none()
			&& self.description.is_none()
			&& self.status.is_none()
			&& self.category.is_none()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn into_task_defaults_status_to_todo() {
		let owner = UserId::generate();
		let org = OrgId::generate();
		let task = NewTask::new("Ship it").into_task(owner, org);
		assert_eq!(task.status, TaskStatus::Todo);
		assert_eq!(task.owner_id, owner);
		assert_eq!(task.organization_id, org);
		assert_eq!(task.created_at, task.updated_at);
	}

	#[test]
	fn new_task_deserializes_with_missing_optionals() {
		let input: NewTask = serde_json::from_str(r#"{"title":"Write docs"}"#).unwrap();
		assert_eq!(input.title, "Write docs");
		assert!(input.organization_id.is_none());
		assert!(input.status.is_none());
	}

	#[test]
	fn patch_is_empty_only_without_fields() {
		assert!(TaskPatch::default().is_empty());
		let patch = TaskPatch {
			status: Some(TaskStatus::Complete),
			..Default::default()
		};
		assert!(!patch.is_empty());
	}

	#[test]
	fn patch_ignores_organization_field() {
		let body = r#"{"title":"x","organization_id":"550e8400-e29b-41d4-a716-446655440000"}"#;
		let patch: TaskPatch = serde_json::from_str(body).unwrap();
		assert_eq!(patch.title.as_deref(), Some("x"));
	}
}
