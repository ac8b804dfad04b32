// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hierarchical task authorization for Canopy.
//!
//! Users belong to exactly one organization in a single organization tree and
//! may see or act on tasks in that organization or anywhere below it, subject
//! to their [`Role`]. This crate holds the pieces of that decision that need
//! no I/O:
//!
//! - [`hierarchy`]: [`OrgTree`] and [`HierarchyResolver`] compute subtree
//!   closures and access scopes from one snapshot of the hierarchy
//! - [`authz`]: per-operation allow/deny rules with typed [`DenyReason`]s
//! - domain types for organizations, users, and tasks

pub mod authz;
pub mod hierarchy;
pub mod org;
pub mod task;
pub mod types;
pub mod user;

pub use authz::{Decision, DenyReason, Operation};
pub use hierarchy::{AccessScope, HierarchyResolver, HierarchySnapshot, OrgTree};
pub use org::Organization;
pub use task::{NewTask, Task, TaskDetails, TaskPatch};
pub use types::{OrgId, ParseEnumError, Role, TaskId, TaskStatus, UserId};
pub use user::{User, UserSummary};
