// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Payload checks run before any store access.

use canopy_server_auth::{NewTask, TaskPatch};

use crate::error::TaskError;

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_CATEGORY_LEN: usize = 64;

pub fn validate_new_task(input: &NewTask) -> Result<(), TaskError> {
	validate_title(&input.title)?;
	validate_optional(
		"description",
		input.description.as_deref(),
		MAX_DESCRIPTION_LEN,
	)?;
	validate_optional("category", input.category.as_deref(), MAX_CATEGORY_LEN)
}

pub fn validate_patch(patch: &TaskPatch) -> Result<(), TaskError> {
	if let Some(title) = &patch.title {
		validate_title(title)?;
	}
	validate_optional(
		"description",
		patch.description.as_deref(),
		MAX_DESCRIPTION_LEN,
	)?;
	validate_optional("category", patch.category.as_deref(), MAX_CATEGORY_LEN)
}

fn validate_title(title: &str) -> Result<(), TaskError> {
	if title.trim().is_empty() {
		return Err(TaskError::InvalidInput("title must not be empty".to_string()));
	}
	check_len("title", title, MAX_TITLE_LEN)
}

fn validate_optional(field: &str, value: Option<&str>, max: usize) -> Result<(), TaskError> {
	match value {
		Some(value) => check_len(field, value, max),
		None => Ok(()),
	}
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), TaskError> {
	if value.chars().count() > max {
		return Err(TaskError::InvalidInput(format!(
			"{field} must be at most {max} characters"
		)));
	}
	Ok(())
}
