// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization entity.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::types::OrgId;

/// A node in the organization tree.
///
/// Every organization except the root has exactly one parent. The tree is the
/// single source of truth for which tasks a user may see or act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
	/// Unique, immutable identifier.
	pub id: OrgId,

	/// Display name.
	pub name: String,

	/// Parent organization; `None` only for the root.
	pub parent_id: Option<OrgId>,

	/// When the organization was created.
	pub created_at: DateTime<Utc>,
}

impl Organization {
	/// Creates a new organization under `parent_id` with a fresh id.
	pub fn new(name: impl Into<String>, parent_id: Option<OrgId>) -> Self {
		Self {
			id: OrgId::generate(),
			name: name.into(),
			parent_id,
			created_at: Utc::now().trunc_subsecs(6),
		}
	}

	/// Returns true if this organization has no parent.
	pub fn is_root(&self) -> bool {
		self.parent_id.is_none()
	}
}
