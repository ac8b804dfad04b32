// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization tree rendering and integrity reports.

use std::collections::HashSet;

use canopy_server_auth::{OrgId, OrgTree};
use serde::Serialize;

/// One organization in `canopy orgs tree` output.
#[derive(Debug, Serialize)]
pub struct OrgNode {
	pub id: OrgId,
	pub name: String,
	pub parent_id: Option<OrgId>,
	pub depth: usize,
}

/// Lists every organization reachable from a root in depth-first pre-order,
/// so each node follows its parent. Organizations on a cycle or below a
/// missing parent are left out; `integrity_report` lists them.
pub fn render_tree(tree: &OrgTree) -> Vec<OrgNode> {
	let mut seen = HashSet::new();
	let mut nodes = Vec::new();
	let mut stack: Vec<(OrgId, usize)> = tree.roots().into_iter().rev().map(|id| (id, 0)).collect();

	while let Some((id, depth)) = stack.pop() {
		if !seen.insert(id) {
			continue;
		}
		let Some(org) = tree.get(id) else {
			continue;
		};
		nodes.push(OrgNode {
			id,
			name: org.name.clone(),
			parent_id: org.parent_id,
			depth,
		});
		stack.extend(tree.children(id).iter().rev().map(|child| (*child, depth + 1)));
	}

	nodes
}

#[derive(Debug, Serialize)]
pub struct IntegrityReport {
	pub revision: i64,
	pub organizations: usize,
	pub roots: Vec<OrgId>,
	pub orphans: Vec<OrgId>,
	pub cycle: Option<Vec<OrgId>>,
	pub healthy: bool,
}

/// Checks the single-root, no-orphan, and acyclic invariants of the tree.
pub fn integrity_report(tree: &OrgTree) -> IntegrityReport {
	let roots = tree.roots();
	let orphans = tree.orphans();
	let cycle = tree.find_cycle();
	let healthy =
		orphans.is_empty() && cycle.is_none() && (roots.len() == 1 || tree.is_empty());

	IntegrityReport {
		revision: tree.revision(),
		organizations: tree.len(),
		roots,
		orphans,
		cycle,
		healthy,
	}
}
