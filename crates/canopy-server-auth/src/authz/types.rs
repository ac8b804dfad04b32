// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Type definitions for task authorization decisions.
//!
//! - [`Operation`]: the task operation being attempted
//! - [`Decision`]: allow, or deny with a [`DenyReason`]
//! - [`DenyReason`]: which rule rejected the request, with a client-facing
//!   message

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operations that can be performed on tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
	List,
	Read,
	Create,
	Update,
	Delete,
}

impl Operation {
	/// Returns true for operations that change stored tasks.
	pub fn is_mutation(&self) -> bool {
		matches!(self, Operation::Create | Operation::Update | Operation::Delete)
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operation::List => write!(f, "list"),
			Operation::Read => write!(f, "read"),
			Operation::Create => write!(f, "create"),
			Operation::Update => write!(f, "update"),
			Operation::Delete => write!(f, "delete"),
		}
	}
}

/// Why an operation was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
	/// The actor's role may never perform this operation.
	#[error("viewers cannot {operation} tasks")]
	ViewerCannotMutate { operation: Operation },

	/// The target lies outside the actor's home organization and the actor is
	/// not an admin.
	#[error("only admins can {operation} tasks in other organizations")]
	CrossOrgRequiresAdmin { operation: Operation },

	/// The requested organization is outside the actor's accessible scope.
	#[error("you do not have access to this organization")]
	OrgNotAccessible,

	/// The existing task belongs to an organization outside the actor's
	/// accessible scope.
	#[error("you do not have access to this task")]
	TaskNotAccessible,
}

/// Outcome of one authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
	Allow,
	Deny(DenyReason),
}

impl Decision {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Decision::Allow)
	}

	pub fn deny_reason(&self) -> Option<DenyReason> {
		match self {
			Decision::Allow => None,
			Decision::Deny(reason) => Some(*reason),
		}
	}

	/// Converts the decision into a `Result` for `?` propagation.
	pub fn into_result(self) -> Result<(), DenyReason> {
		match self {
			Decision::Allow => Ok(()),
			Decision::Deny(reason) => Err(reason),
		}
	}
}

impl From<Result<(), DenyReason>> for Decision {
	fn from(result: Result<(), DenyReason>) -> Self {
		match result {
			Ok(()) => Decision::Allow,
			Err(reason) => Decision::Deny(reason),
		}
	}
}
