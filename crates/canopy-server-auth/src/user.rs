// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User types.
//!
//! Users are provisioned by an external identity process. The authorization
//! engine only reads them and trusts the supplied role and home organization
//! for the duration of one request.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OrgId, Role, UserId};

/// An authenticated user acting on tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub email: String,
	pub role: Role,
	/// The user's home organization.
	pub organization_id: OrgId,
	pub created_at: DateTime<Utc>,
}

impl User {
	pub fn new(email: impl Into<String>, role: Role, organization_id: OrgId) -> Self {
		Self {
			id: UserId::generate(),
			email: email.into(),
			role,
			organization_id,
			created_at: Utc::now().trunc_subsecs(6),
		}
	}

	/// Returns the public summary attached to tasks this user owns.
	pub fn summary(&self) -> UserSummary {
		UserSummary {
			id: self.id,
			email: self.email.clone(),
			role: self.role,
		}
	}
}

/// The owner relation embedded in task listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
	pub id: UserId,
	pub email: String,
	pub role: Role,
}
