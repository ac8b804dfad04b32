// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod authz;
mod database;
mod logging;

pub use authz::{
	AuthzConfig, AuthzConfigLayer, DEFAULT_MAX_CONFLICT_RETRIES, MAX_CONFLICT_RETRIES_LIMIT,
};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
