// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization hierarchy resolution.
//!
//! The hierarchy is loaded from storage once per operation as a
//! [`HierarchySnapshot`] and indexed into an [`OrgTree`]. All closure
//! computations run over that in-memory index:
//!
//! - [`OrgTree::descendants`]: every organization below a node
//! - [`HierarchyResolver::accessible_org_ids`]: a user's home organization plus
//!   its descendants, as an [`AccessScope`]
//! - [`HierarchyResolver::can_access`]: membership test against that scope
//!
//! Traversals keep a visited set. A malformed hierarchy containing a cycle is
//! truncated at the first revisited node and reported with a `warn` event; it
//! never loops.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::org::Organization;
use crate::types::OrgId;
use crate::user::User;

/// All organizations as read in one consistent fetch, tagged with the
/// hierarchy revision they were read at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySnapshot {
	pub revision: i64,
	pub organizations: Vec<Organization>,
}

/// Parent→children index over a [`HierarchySnapshot`].
#[derive(Debug, Clone, Default)]
pub struct OrgTree {
	revision: i64,
	order: Vec<OrgId>,
	orgs: HashMap<OrgId, Organization>,
	children: HashMap<OrgId, Vec<OrgId>>,
}

impl OrgTree {
	/// Builds the index in a single pass over the snapshot.
	pub fn new(snapshot: HierarchySnapshot) -> Self {
		let mut order = Vec::with_capacity(snapshot.organizations.len());
		let mut orgs = HashMap::with_capacity(snapshot.organizations.len());
		let mut children: HashMap<OrgId, Vec<OrgId>> = HashMap::new();

		for org in snapshot.organizations {
			if let Some(parent_id) = org.parent_id {
				children.entry(parent_id).or_default().push(org.id);
			}
			order.push(org.id);
			orgs.insert(org.id, org);
		}

		Self {
			revision: snapshot.revision,
			order,
			orgs,
			children,
		}
	}

	/// Builds a tree from organizations at revision 0.
	pub fn from_organizations(organizations: Vec<Organization>) -> Self {
		Self::new(HierarchySnapshot {
			revision: 0,
			organizations,
		})
	}

	/// The hierarchy revision this tree was built from.
	pub fn revision(&self) -> i64 {
		self.revision
	}

	pub fn len(&self) -> usize {
		self.orgs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.orgs.is_empty()
	}

	pub fn get(&self, org_id: OrgId) -> Option<&Organization> {
		self.orgs.get(&org_id)
	}

	pub fn contains(&self, org_id: OrgId) -> bool {
		self.orgs.contains_key(&org_id)
	}

	/// Organizations in snapshot order.
	pub fn iter(&self) -> impl Iterator<Item = &Organization> {
		self.order.iter().filter_map(|id| self.orgs.get(id))
	}

	/// Direct children of `org_id`, in snapshot order.
	pub fn children(&self, org_id: OrgId) -> &[OrgId] {
		self
			.children
			.get(&org_id)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	/// Organizations without a parent.
	pub fn roots(&self) -> Vec<OrgId> {
		self
			.iter()
			.filter(|org| org.is_root())
			.map(|org| org.id)
			.collect()
	}

	/// Organizations whose parent is not part of the snapshot.
	pub fn orphans(&self) -> Vec<OrgId> {
		self
			.iter()
			.filter(|org| matches!(org.parent_id, Some(parent) if !self.contains(parent)))
			.map(|org| org.id)
			.collect()
	}

	/// Returns every organization reachable below `org_id`, excluding `org_id`
	/// itself.
	///
	/// An unknown id or a leaf yields an empty set.
	pub fn descendants(&self, org_id: OrgId) -> HashSet<OrgId> {
		let mut visited = HashSet::from([org_id]);
		let mut result = HashSet::new();
		let mut stack: Vec<OrgId> = self.children(org_id).to_vec();

		while let Some(current) = stack.pop() {
			if !visited.insert(current) {
				tracing::warn!(
					root = %org_id,
					org_id = %current,
					revision = self.revision,
					"organization reached twice during traversal, hierarchy contains a cycle"
				);
				continue;
			}
			result.insert(current);
			stack.extend_from_slice(self.children(current));
		}

		result
	}

	/// Returns true if `candidate` lies strictly below `ancestor`.
	pub fn is_descendant(&self, ancestor: OrgId, candidate: OrgId) -> bool {
		ancestor != candidate && self.descendants(ancestor).contains(&candidate)
	}

	/// Finds a cycle in the parent links, returned as the ids on the cycle in
	/// child→parent order.
	pub fn find_cycle(&self) -> Option<Vec<OrgId>> {
		let mut cleared: HashSet<OrgId> = HashSet::new();

		for start in &self.order {
			let mut path = Vec::new();
			let mut on_path = HashSet::new();
			let mut cursor = Some(*start);

			while let Some(id) = cursor {
				if cleared.contains(&id) {
					break;
				}
				if !on_path.insert(id) {
					let from = path.iter().position(|p| *p == id).unwrap_or(0);
					return Some(path[from..].to_vec());
				}
				path.push(id);
				cursor = self.orgs.get(&id).and_then(|org| org.parent_id);
			}

			cleared.extend(path);
		}

		None
	}
}

/// The set of organizations a user may act within: their home organization
/// plus all of its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
	home: OrgId,
	org_ids: HashSet<OrgId>,
}

impl AccessScope {
	pub fn home(&self) -> OrgId {
		self.home
	}

	pub fn contains(&self, org_id: OrgId) -> bool {
		self.org_ids.contains(&org_id)
	}

	pub fn len(&self) -> usize {
		self.org_ids.len()
	}

	/// Always false: the home organization is part of every scope.
	pub fn is_empty(&self) -> bool {
		self.org_ids.is_empty()
	}

	pub fn as_set(&self) -> &HashSet<OrgId> {
		&self.org_ids
	}

	/// Scope members in a stable order, for use as query parameters.
	pub fn to_sorted_vec(&self) -> Vec<OrgId> {
		let mut ids: Vec<OrgId> = self.org_ids.iter().copied().collect();
		ids.sort();
		ids
	}
}

/// Resolves access scopes for users against one [`OrgTree`] snapshot.
///
/// Results depend only on the user's home organization and the snapshot, never
/// on role.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyResolver<'a> {
	tree: &'a OrgTree,
}

impl<'a> HierarchyResolver<'a> {
	pub fn new(tree: &'a OrgTree) -> Self {
		Self { tree }
	}

	pub fn tree(&self) -> &'a OrgTree {
		self.tree
	}

	pub fn descendants(&self, org_id: OrgId) -> HashSet<OrgId> {
		self.tree.descendants(org_id)
	}

	pub fn accessible_org_ids(&self, user: &User) -> AccessScope {
		let home = user.organization_id;
		let mut org_ids = self.tree.descendants(home);
		org_ids.insert(home);
		AccessScope { home, org_ids }
	}

	pub fn can_access(&self, user: &User, org_id: OrgId) -> bool {
		self.accessible_org_ids(user).contains(org_id)
	}
}
