// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("{entity} not found: {id}")]
	NotFound { entity: &'static str, id: String },

	#[error("Conflict: {0}")]
	Conflict(String),

	/// A stored value could not be decoded into its domain type.
	#[error("Corrupt row in {table}: {message}")]
	CorruptRow { table: &'static str, message: String },

	#[error("Internal: {0}")]
	Internal(String),
}

impl DbError {
	pub(crate) fn corrupt(table: &'static str, message: impl std::fmt::Display) -> Self {
		DbError::CorruptRow {
			table,
			message: message.to_string(),
		}
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
