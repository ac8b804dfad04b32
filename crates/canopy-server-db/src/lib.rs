// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Canopy.
//!
//! Each entity has a `*Store` trait and a `*Repository` implementation backed
//! by a [`sqlx::SqlitePool`]. Task writes are conditional on the hierarchy
//! revision so that an authorization decision and the write it permits see
//! the same organization tree.

pub mod error;
pub mod org;
pub mod pool;
pub mod schema;
pub mod seed;
pub mod task;
pub mod testing;
mod types;
pub mod user;

pub use error::{DbError, Result};
pub use org::{OrgRepository, OrgStore};
pub use pool::create_pool;
pub use schema::run_migrations;
pub use seed::{seed_demo_data, SeedSummary};
pub use task::{TaskGuard, TaskRepository, TaskStore};
pub use user::{UserRepository, UserStore};
