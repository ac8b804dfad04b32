// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Task authorization settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Extra attempts after a guarded task write misses, before giving up.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;
pub const MAX_CONFLICT_RETRIES_LIMIT: u32 = 16;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthzConfigLayer {
	pub max_conflict_retries: Option<u32>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.max_conflict_retries.is_some() {
			self.max_conflict_retries = other.max_conflict_retries;
		}
	}

	pub fn finalize(self) -> AuthzConfig {
		AuthzConfig {
			max_conflict_retries: self
				.max_conflict_retries
				.unwrap_or(DEFAULT_MAX_CONFLICT_RETRIES),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthzConfig {
	/// Extra attempts for a task write whose hierarchy guard missed.
	pub max_conflict_retries: u32,
}

impl Default for AuthzConfig {
	fn default() -> Self {
		Self {
			max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
		}
	}
}

impl AuthzConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_conflict_retries > MAX_CONFLICT_RETRIES_LIMIT {
			return Err(ConfigError::Validation(format!(
				"authz.max_conflict_retries must be at most {MAX_CONFLICT_RETRIES_LIMIT}, got {}",
				self.max_conflict_retries
			)));
		}
		Ok(())
	}
}
