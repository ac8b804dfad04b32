// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build information for `canopy version`.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
	pub name: &'static str,
	pub version: &'static str,
	pub platform: String,
}

impl BuildInfo {
	pub fn current() -> Self {
		Self {
			name: env!("CARGO_PKG_NAME"),
			version: env!("CARGO_PKG_VERSION"),
			platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
		}
	}
}
