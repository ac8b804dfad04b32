// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Column encoding shared by the repositories.
//!
//! IDs and enums are stored as text. Timestamps are stored as fixed-width
//! RFC 3339 strings in UTC with microsecond precision so that lexical order in
//! SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::DbError;

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(table: &'static str, value: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::corrupt(table, format!("invalid timestamp '{value}': {e}")))
}

/// Decodes a text column into any type with a `FromStr` impl (ids, roles,
/// statuses).
pub(crate) fn parse_column<T>(table: &'static str, value: &str) -> Result<T, DbError>
where
	T: FromStr,
	T::Err: Display,
{
	value
		.parse()
		.map_err(|e| DbError::corrupt(table, format!("invalid value '{value}': {e}")))
}
