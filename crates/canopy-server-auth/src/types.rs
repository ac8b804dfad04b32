// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions shared by the hierarchy resolver and the
//! authorization engine.
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs ([`OrgId`], [`UserId`],
//!   [`TaskId`]) preventing accidental mixing of an organization id with a
//!   task id
//! - **Roles**: the closed [`Role`] variant (viewer, owner, admin)
//! - **Task status**: [`TaskStatus`]
//!
//! All ID types implement transparent serde serialization (as UUID strings) and
//! provide conversion to/from [`uuid::Uuid`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(OrgId, "Unique identifier for an organization.");
define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(TaskId, "Unique identifier for a task.");

/// Error returned when parsing a [`Role`] or [`TaskStatus`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
	pub kind: &'static str,
	pub value: String,
}

// =============================================================================
// Roles
// =============================================================================

/// A user's role within their home organization.
///
/// Capability is not a simple rank: viewers never mutate, owners have full
/// control inside their home organization, and admins additionally reach into
/// organizations below it. Rules are expressed per operation in
/// [`crate::authz`], never by comparing roles numerically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Read-only access to the accessible scope.
	#[default]
	Viewer,
	/// Full task control within the home organization.
	Owner,
	/// Full task control within the home organization and its descendants.
	Admin,
}

impl Role {
	/// Returns all available roles.
	pub fn all() -> &'static [Role] {
		&[Role::Viewer, Role::Owner, Role::Admin]
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Viewer => write!(f, "viewer"),
			Role::Owner => write!(f, "owner"),
			Role::Admin => write!(f, "admin"),
		}
	}
}

impl FromStr for Role {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"viewer" => Ok(Role::Viewer),
			"owner" => Ok(Role::Owner),
			"admin" => Ok(Role::Admin),
			_ => Err(ParseEnumError {
				kind: "role",
				value: s.to_string(),
			}),
		}
	}
}

// =============================================================================
// Task Status
// =============================================================================

/// Workflow status of a task. Any status may be set by anyone allowed to
/// update the task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
	#[default]
	Todo,
	InProgress,
	Complete,
}

impl fmt::Display for TaskStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TaskStatus::Todo => write!(f, "todo"),
			TaskStatus::InProgress => write!(f, "in_progress"),
			TaskStatus::Complete => write!(f, "complete"),
		}
	}
}

impl FromStr for TaskStatus {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"todo" => Ok(TaskStatus::Todo),
			"in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
			"complete" => Ok(TaskStatus::Complete),
			_ => Err(ParseEnumError {
				kind: "task status",
				value: s.to_string(),
			}),
		}
	}
}
