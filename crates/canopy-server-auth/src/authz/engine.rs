// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Task authorization engine.
//!
//! This module contains the [`decide`] function and its per-operation rules.
//! Every rule is a pure function of the actor, the actor's [`AccessScope`], and
//! the organization the operation targets:
//!
//! 1. **Role gate**: viewers never create, update, or delete
//! 2. **Home organization**: any non-viewer may mutate inside their home org
//! 3. **Cross-organization**: only admins, and only inside their scope
//!
//! Reads and listings need scope membership only. Capability is not a ranking:
//! the extra power of an admin is reach into descendant organizations, nothing
//! more.

use tracing::instrument;

use super::types::{Decision, DenyReason, Operation};
use crate::hierarchy::AccessScope;
use crate::types::{OrgId, Role};
use crate::user::User;

/// Decides whether `actor` may perform `operation` on a task scoped to
/// `target_org_id`.
///
/// For [`Operation::Create`] the target is the effective organization from
/// [`create_target`]; for read, update, and delete it is the existing task's
/// organization. [`Operation::List`] is always allowed since the listing itself
/// is filtered to the scope.
///
/// # Tracing
///
/// The decision and the deciding attributes are logged at debug level.
#[instrument(
    level = "debug",
    skip(actor, scope),
    fields(
        user_id = %actor.id,
        role = %actor.role,
        home_org_id = %actor.organization_id,
        operation = %operation,
        target_org_id = %target_org_id,
    )
)]
pub fn decide(
	actor: &User,
	scope: &AccessScope,
	operation: Operation,
	target_org_id: OrgId,
) -> Decision {
	let decision = match operation {
		Operation::List => Decision::Allow,
		Operation::Read => evaluate_read(scope, target_org_id),
		Operation::Create => evaluate_create(actor, scope, target_org_id),
		Operation::Update | Operation::Delete => {
			evaluate_mutation(actor, scope, operation, target_org_id)
		}
	};

	tracing::debug!(?decision, "authorization decision");
	decision
}

/// Resolves the organization a new task lands in: the requested one, or the
/// actor's home organization.
pub fn create_target(actor: &User, requested: Option<OrgId>) -> OrgId {
	requested.unwrap_or(actor.organization_id)
}

/// Convenience wrapper for [`Operation::Read`].
pub fn authorize_read(actor: &User, scope: &AccessScope, task_org_id: OrgId) -> Decision {
	decide(actor, scope, Operation::Read, task_org_id)
}

/// Convenience wrapper for [`Operation::Create`].
pub fn authorize_create(actor: &User, scope: &AccessScope, target_org_id: OrgId) -> Decision {
	decide(actor, scope, Operation::Create, target_org_id)
}

/// Convenience wrapper for [`Operation::Update`].
pub fn authorize_update(actor: &User, scope: &AccessScope, task_org_id: OrgId) -> Decision {
	decide(actor, scope, Operation::Update, task_org_id)
}

/// Convenience wrapper for [`Operation::Delete`].
pub fn authorize_delete(actor: &User, scope: &AccessScope, task_org_id: OrgId) -> Decision {
	decide(actor, scope, Operation::Delete, task_org_id)
}

fn evaluate_read(scope: &AccessScope, task_org_id: OrgId) -> Decision {
	if scope.contains(task_org_id) {
		Decision::Allow
	} else {
		Decision::Deny(DenyReason::TaskNotAccessible)
	}
}

fn evaluate_create(actor: &User, scope: &AccessScope, target_org_id: OrgId) -> Decision {
	if actor.role == Role::Viewer {
		return Decision::Deny(DenyReason::ViewerCannotMutate {
			operation: Operation::Create,
		});
	}

	if target_org_id == actor.organization_id {
		return Decision::Allow;
	}

	if actor.role != Role::Admin {
		return Decision::Deny(DenyReason::CrossOrgRequiresAdmin {
			operation: Operation::Create,
		});
	}

	if !scope.contains(target_org_id) {
		return Decision::Deny(DenyReason::OrgNotAccessible);
	}

	Decision::Allow
}

fn evaluate_mutation(
	actor: &User,
	scope: &AccessScope,
	operation: Operation,
	task_org_id: OrgId,
) -> Decision {
	if actor.role == Role::Viewer {
		return Decision::Deny(DenyReason::ViewerCannotMutate { operation });
	}

	if task_org_id == actor.organization_id {
		return Decision::Allow;
	}

	if actor.role != Role::Admin {
		return Decision::Deny(DenyReason::CrossOrgRequiresAdmin { operation });
	}

	if !scope.contains(task_org_id) {
		return Decision::Deny(DenyReason::TaskNotAccessible);
	}

	Decision::Allow
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hierarchy::{HierarchyResolver, HierarchySnapshot, OrgTree};
	use crate::org::Organization;

	struct Fixture {
		tree: OrgTree,
		acme: OrgId,
		engineering: OrgId,
		frontend: OrgId,
		sales: OrgId,
	}

	impl Fixture {
		fn user(&self, role: Role, home: OrgId) -> (User, AccessScope) {
			let user = User::new(format!("{role}@acme.com"), role, home);
			let scope = HierarchyResolver::new(&self.tree).accessible_org_ids(&user);
			(user, scope)
		}

		fn all_orgs(&self) -> [OrgId; 4] {
			[self.acme, self.engineering, self.frontend, self.sales]
		}
	}

	/// Acme → {Engineering → {Frontend}, Sales}
	fn fixture() -> Fixture {
		let acme = Organization::new("Acme Corporation", None);
		let engineering = Organization::new("Engineering", Some(acme.id));
		let sales = Organization::new("Sales", Some(acme.id));
		let frontend = Organization::new("Frontend Team", Some(engineering.id));
		let ids = (acme.id, engineering.id, frontend.id, sales.id);

		Fixture {
			tree: OrgTree::new(HierarchySnapshot {
				revision: 1,
				organizations: vec![acme, engineering, sales, frontend],
			}),
			acme: ids.0,
			engineering: ids.1,
			frontend: ids.2,
			sales: ids.3,
		}
	}

	mod list_and_read {
		use super::*;

		#[test]
		fn list_is_always_allowed() {
			let f = fixture();
			for role in Role::all() {
				let (user, scope) = f.user(*role, f.frontend);
				assert!(decide(&user, &scope, Operation::List, f.acme).is_allowed());
			}
		}

		#[test]
		fn viewer_can_read_inside_scope() {
			let f = fixture();
			let (user, scope) = f.user(Role::Viewer, f.engineering);
			assert!(authorize_read(&user, &scope, f.engineering).is_allowed());
			assert!(authorize_read(&user, &scope, f.frontend).is_allowed());
		}

		#[test]
		fn read_outside_scope_is_denied() {
			let f = fixture();
			let (user, scope) = f.user(Role::Admin, f.engineering);
			assert_eq!(
				authorize_read(&user, &scope, f.sales),
				Decision::Deny(DenyReason::TaskNotAccessible)
			);
			assert_eq!(
				authorize_read(&user, &scope, f.acme),
				Decision::Deny(DenyReason::TaskNotAccessible)
			);
		}
	}

	mod create {
		use super::*;

		#[test]
		fn admin_can_create_in_descendant() {
			let f = fixture();
			let (ceo, scope) = f.user(Role::Admin, f.acme);
			assert!(authorize_create(&ceo, &scope, f.frontend).is_allowed());
		}

		#[test]
		fn admin_cannot_create_in_ancestor() {
			let f = fixture();
			let (manager, scope) = f.user(Role::Admin, f.engineering);
			assert_eq!(
				authorize_create(&manager, &scope, f.acme),
				Decision::Deny(DenyReason::OrgNotAccessible)
			);
		}

		#[test]
		fn admin_cannot_create_in_sibling() {
			let f = fixture();
			let (manager, scope) = f.user(Role::Admin, f.engineering);
			assert_eq!(
				authorize_create(&manager, &scope, f.sales),
				Decision::Deny(DenyReason::OrgNotAccessible)
			);
		}

		#[test]
		fn owner_can_create_in_home_org() {
			let f = fixture();
			let (dev, scope) = f.user(Role::Owner, f.frontend);
			assert!(authorize_create(&dev, &scope, f.frontend).is_allowed());
		}

		#[test]
		fn owner_cannot_create_in_descendant() {
			let f = fixture();
			let (owner, scope) = f.user(Role::Owner, f.engineering);
			assert_eq!(
				authorize_create(&owner, &scope, f.frontend),
				Decision::Deny(DenyReason::CrossOrgRequiresAdmin {
					operation: Operation::Create
				})
			);
		}

		#[test]
		fn viewer_is_rejected_before_org_checks() {
			let f = fixture();
			let (viewer, scope) = f.user(Role::Viewer, f.sales);
			let expected = Decision::Deny(DenyReason::ViewerCannotMutate {
				operation: Operation::Create,
			});
			assert_eq!(authorize_create(&viewer, &scope, f.sales), expected);
			assert_eq!(authorize_create(&viewer, &scope, f.acme), expected);
		}

		#[test]
		fn create_target_defaults_to_home() {
			let f = fixture();
			let (dev, _) = f.user(Role::Owner, f.frontend);
			assert_eq!(create_target(&dev, None), f.frontend);
			assert_eq!(create_target(&dev, Some(f.sales)), f.sales);
		}
	}

	mod mutation {
		use super::*;

		#[test]
		fn owner_can_mutate_any_task_in_home_org() {
			let f = fixture();
			let (dev, scope) = f.user(Role::Owner, f.frontend);
			assert!(authorize_update(&dev, &scope, f.frontend).is_allowed());
			assert!(authorize_delete(&dev, &scope, f.frontend).is_allowed());
		}

		#[test]
		fn owner_cannot_update_outside_home_org() {
			let f = fixture();
			let (dev, scope) = f.user(Role::Owner, f.frontend);
			let decision = authorize_update(&dev, &scope, f.sales);
			assert_eq!(
				decision,
				Decision::Deny(DenyReason::CrossOrgRequiresAdmin {
					operation: Operation::Update
				})
			);
			assert_eq!(
				decision.deny_reason().unwrap().to_string(),
				"only admins can update tasks in other organizations"
			);
		}

		#[test]
		fn owner_cannot_delete_in_descendant() {
			let f = fixture();
			let (owner, scope) = f.user(Role::Owner, f.engineering);
			assert_eq!(
				authorize_delete(&owner, &scope, f.frontend),
				Decision::Deny(DenyReason::CrossOrgRequiresAdmin {
					operation: Operation::Delete
				})
			);
		}

		#[test]
		fn admin_can_mutate_in_descendant() {
			let f = fixture();
			let (manager, scope) = f.user(Role::Admin, f.engineering);
			assert!(authorize_update(&manager, &scope, f.frontend).is_allowed());
			assert!(authorize_delete(&manager, &scope, f.frontend).is_allowed());
		}

		#[test]
		fn admin_cannot_mutate_outside_scope() {
			let f = fixture();
			let (manager, scope) = f.user(Role::Admin, f.engineering);
			assert_eq!(
				authorize_update(&manager, &scope, f.sales),
				Decision::Deny(DenyReason::TaskNotAccessible)
			);
			assert_eq!(
				authorize_delete(&manager, &scope, f.acme),
				Decision::Deny(DenyReason::TaskNotAccessible)
			);
		}

		#[test]
		fn viewer_cannot_mutate_own_org() {
			let f = fixture();
			let (viewer, scope) = f.user(Role::Viewer, f.sales);
			assert_eq!(
				authorize_delete(&viewer, &scope, f.sales),
				Decision::Deny(DenyReason::ViewerCannotMutate {
					operation: Operation::Delete
				})
			);
		}
	}

	mod property_tests {
		use super::*;
		use proptest::prelude::*;

		fn arb_role() -> impl Strategy<Value = Role> {
			prop_oneof![Just(Role::Viewer), Just(Role::Owner), Just(Role::Admin)]
		}

		fn arb_mutation() -> impl Strategy<Value = Operation> {
			prop_oneof![
				Just(Operation::Create),
				Just(Operation::Update),
				Just(Operation::Delete),
			]
		}

		proptest! {
				#[test]
				fn viewers_never_mutate(
						home in 0usize..4,
						target in 0usize..4,
						operation in arb_mutation(),
				) {
						let f = fixture();
						let orgs = f.all_orgs();
						let (viewer, scope) = f.user(Role::Viewer, orgs[home]);
						let decision = decide(&viewer, &scope, operation, orgs[target]);
						prop_assert_eq!(
								decision,
								Decision::Deny(DenyReason::ViewerCannotMutate { operation })
						);
				}

				#[test]
				fn cross_org_mutation_requires_admin_and_scope(
						role in arb_role(),
						home in 0usize..4,
						target in 0usize..4,
						operation in arb_mutation(),
				) {
						let f = fixture();
						let orgs = f.all_orgs();
						prop_assume!(home != target);
						let (user, scope) = f.user(role, orgs[home]);
						let decision = decide(&user, &scope, operation, orgs[target]);
						let expected = role == Role::Admin && scope.contains(orgs[target]);
						prop_assert_eq!(decision.is_allowed(), expected);
				}

				#[test]
				fn same_org_mutation_allowed_for_non_viewers(
						role in arb_role(),
						home in 0usize..4,
						operation in arb_mutation(),
				) {
						let f = fixture();
						let orgs = f.all_orgs();
						let (user, scope) = f.user(role, orgs[home]);
						let decision = decide(&user, &scope, operation, orgs[home]);
						prop_assert_eq!(decision.is_allowed(), role != Role::Viewer);
				}

				#[test]
				fn reads_follow_scope_for_every_role(
						role in arb_role(),
						home in 0usize..4,
						target in 0usize..4,
				) {
						let f = fixture();
						let orgs = f.all_orgs();
						let (user, scope) = f.user(role, orgs[home]);
						prop_assert_eq!(
								authorize_read(&user, &scope, orgs[target]).is_allowed(),
								scope.contains(orgs[target])
						);
				}
		}
	}
}
