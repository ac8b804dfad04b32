// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use canopy_server_auth::DenyReason;
use canopy_server_db::DbError;

/// Failures returned by [`crate::TaskService`].
///
/// Every variant is scoped to one request. Transports map `NotFound`,
/// `Forbidden`, and `InvalidInput` to client errors and the rest to server
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
	#[error("task not found")]
	NotFound,

	#[error("{0}")]
	Forbidden(#[from] DenyReason),

	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// The organization tree or the task kept changing underneath the
	/// request.
	#[error("conflicting concurrent modification, try again")]
	Conflict,

	#[error(transparent)]
	Storage(#[from] DbError),
}

impl TaskError {
	/// Returns the denial reason for `Forbidden` errors.
	pub fn deny_reason(&self) -> Option<DenyReason> {
		match self {
			TaskError::Forbidden(reason) => Some(*reason),
			_ => None,
		}
	}

	/// Returns true for errors caused by the request itself rather than the
	/// server.
	pub fn is_client_error(&self) -> bool {
		matches!(
			self,
			TaskError::NotFound | TaskError::Forbidden(_) | TaskError::InvalidInput(_)
		)
	}
}

pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
	use super::*;
	use canopy_server_auth::Operation;

	#[test]
	fn forbidden_displays_reason() {
		let err = TaskError::from(DenyReason::ViewerCannotMutate {
			operation: Operation::Delete,
		});
		assert_eq!(err.to_string(), "viewers cannot delete tasks");
		assert!(err.is_client_error());
		assert_eq!(
			err.deny_reason(),
			Some(DenyReason::ViewerCannotMutate {
				operation: Operation::Delete
			})
		);
	}

	#[test]
	fn storage_errors_are_server_errors() {
		let err = TaskError::from(DbError::Internal("boom".to_string()));
		assert!(!err.is_client_error());
		assert!(err.deny_reason().is_none());
		assert!(!TaskError::Conflict.is_client_error());
	}
}
