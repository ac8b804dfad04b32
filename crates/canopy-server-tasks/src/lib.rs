// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Task operations for Canopy, authorized against the organization tree.
//!
//! [`TaskService`] exposes the five public operations. Each one validates its
//! input, resolves the caller's accessible scope from a single hierarchy
//! snapshot, consults [`canopy_server_auth::authz`], and only then reads or
//! writes task storage.

pub mod error;
pub mod service;
pub mod validation;

pub use error::{Result, TaskError};
pub use canopy_server_config::DEFAULT_MAX_CONFLICT_RETRIES;
pub use service::TaskService;
