// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Task authorization rules.

pub mod engine;
pub mod types;

pub use engine::{
	authorize_create, authorize_delete, authorize_read, authorize_update, create_target, decide,
};
pub use types::{Decision, DenyReason, Operation};
