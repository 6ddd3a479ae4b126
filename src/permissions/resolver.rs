//! Capability resolution over the guardianship graph.
//!
//! A state-free decision table evaluated in fixed precedence order, first
//! match wins. Self-access and superadmin short-circuit before any edge is
//! consulted; observer and advisor edges are evaluated *before* the
//! parent/guardian edges so an explicit narrow grant (an observer without
//! comment rights) is never widened by a coincidental guardianship match
//! elsewhere in the graph.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::BrokerResult;
use crate::identity::{Principal, Role};

use super::edges::{LinkStatus, RelationshipEdge, RelationshipSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewProfile,
    ViewEvidence,
    Comment,
    Manage,
}

pub struct PermissionResolver;

impl PermissionResolver {
    /// Decide `capability` for `actor` over `subject`, given the
    /// actor→subject edges.
    pub fn can(
        actor: &Principal,
        subject: &Principal,
        capability: Capability,
        edges: &[RelationshipEdge],
    ) -> bool {
        // 1. Self-access. (The manage carve-out for resources requiring a
        // distinct manager is resource-semantic and belongs to the caller.)
        if actor.id == subject.id {
            return true;
        }

        // An org_managed principal must have its org_role resolved before
        // any cross-principal check; fail closed otherwise.
        let Some(actor_role) = actor.effective_role() else {
            warn!("unresolved org_role for principal {}, denying", actor.id);
            return false;
        };

        // 2. Superadmin.
        if actor_role == Role::Superadmin {
            return true;
        }

        // 3. Observer link decides terminally: its flags are an explicit,
        // narrow grant.
        if let Some((can_comment, can_view_evidence)) = edges.iter().find_map(|e| match e {
            RelationshipEdge::ObserverLink { can_comment, can_view_evidence } => {
                Some((*can_comment, *can_view_evidence))
            }
            _ => None,
        }) {
            return match capability {
                Capability::ViewProfile => true,
                Capability::ViewEvidence => can_view_evidence,
                Capability::Comment => can_comment,
                Capability::Manage => false,
            };
        }

        // 4. Active advisor assignment; manage is deferred to org-scoped
        // admin rules, which are not this table's to grant.
        let active_advisor = edges
            .iter()
            .any(|e| matches!(e, RelationshipEdge::AdvisorAssignment { is_active: true }));
        if actor_role == Role::Advisor && active_advisor {
            return match capability {
                Capability::ViewProfile | Capability::ViewEvidence | Capability::Comment => true,
                Capability::Manage => false,
            };
        }

        // 5. Dependent-of-parent: full guardianship grant.
        if edges.iter().any(|e| matches!(e, RelationshipEdge::ManagedByParent)) {
            return true;
        }

        // 6. Approved parent link: same grants as guardianship.
        if edges.iter().any(|e| {
            matches!(e, RelationshipEdge::LinkedParent { status: LinkStatus::Approved })
        }) {
            return true;
        }

        // 7. Default deny.
        false
    }

    /// Convenience over a `RelationshipSource`.
    pub fn can_via<S: RelationshipSource>(
        source: &S,
        actor: &Principal,
        subject: &Principal,
        capability: Capability,
    ) -> BrokerResult<bool> {
        // Self and superadmin never need the graph.
        if actor.id == subject.id || actor.effective_role() == Some(Role::Superadmin) {
            return Ok(true);
        }
        let edges = source.edges(actor.id, subject.id)?;
        Ok(Self::can(actor, subject, capability, &edges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Capability; 4] = [
        Capability::ViewProfile,
        Capability::ViewEvidence,
        Capability::Comment,
        Capability::Manage,
    ];

    fn p(role: Role) -> Principal {
        Principal::new(Uuid::new_v4(), role)
    }

    #[test]
    fn self_access_allows_every_capability() {
        for role in [Role::Student, Role::Parent, Role::Observer, Role::OrgManaged] {
            let actor = p(role);
            for cap in ALL {
                assert!(PermissionResolver::can(&actor, &actor, cap, &[]));
            }
        }
    }

    #[test]
    fn superadmin_allows_everything() {
        let admin = p(Role::Superadmin);
        let subject = p(Role::Student);
        for cap in ALL {
            assert!(PermissionResolver::can(&admin, &subject, cap, &[]));
        }
    }

    #[test]
    fn unrelated_user_is_denied() {
        let actor = p(Role::Student);
        let subject = p(Role::Student);
        for cap in ALL {
            assert!(!PermissionResolver::can(&actor, &subject, cap, &[]));
        }
    }

    #[test]
    fn observer_flags_gate_evidence_and_comment() {
        let observer = p(Role::Observer);
        let student = p(Role::Student);
        let edges = [RelationshipEdge::ObserverLink { can_comment: false, can_view_evidence: true }];
        assert!(PermissionResolver::can(&observer, &student, Capability::ViewProfile, &edges));
        assert!(PermissionResolver::can(&observer, &student, Capability::ViewEvidence, &edges));
        assert!(!PermissionResolver::can(&observer, &student, Capability::Comment, &edges));
        assert!(!PermissionResolver::can(&observer, &student, Capability::Manage, &edges));
    }

    #[test]
    fn observer_grant_is_not_widened_by_guardianship() {
        // A parent who also holds an observer link without comment rights:
        // the narrower observer grant decides first.
        let parent = p(Role::Parent);
        let child = p(Role::Student);
        let edges = [
            RelationshipEdge::ObserverLink { can_comment: false, can_view_evidence: false },
            RelationshipEdge::ManagedByParent,
        ];
        assert!(!PermissionResolver::can(&parent, &child, Capability::Comment, &edges));
        assert!(!PermissionResolver::can(&parent, &child, Capability::ViewEvidence, &edges));
        assert!(PermissionResolver::can(&parent, &child, Capability::ViewProfile, &edges));
    }

    #[test]
    fn advisor_requires_an_active_assignment() {
        let advisor = p(Role::Advisor);
        let student = p(Role::Student);

        let active = [RelationshipEdge::AdvisorAssignment { is_active: true }];
        assert!(PermissionResolver::can(&advisor, &student, Capability::ViewProfile, &active));
        assert!(PermissionResolver::can(&advisor, &student, Capability::ViewEvidence, &active));
        assert!(PermissionResolver::can(&advisor, &student, Capability::Comment, &active));
        // Manage is decided by org-scoped admin rules, not this edge.
        assert!(!PermissionResolver::can(&advisor, &student, Capability::Manage, &active));

        let inactive = [RelationshipEdge::AdvisorAssignment { is_active: false }];
        for cap in ALL {
            assert!(!PermissionResolver::can(&advisor, &student, cap, &inactive));
        }
    }

    #[test]
    fn advisor_edge_grants_nothing_to_non_advisors() {
        // The role check and the edge must both hold.
        let observer = p(Role::Observer);
        let student = p(Role::Student);
        let edges = [RelationshipEdge::AdvisorAssignment { is_active: true }];
        assert!(!PermissionResolver::can(&observer, &student, Capability::ViewProfile, &edges));
    }

    #[test]
    fn guardianship_grants_manage() {
        let parent = p(Role::Parent);
        let dependent = p(Role::Student);
        let edges = [RelationshipEdge::ManagedByParent];
        for cap in ALL {
            assert!(PermissionResolver::can(&parent, &dependent, cap, &edges));
        }
    }

    #[test]
    fn linked_parent_requires_approval() {
        let parent = p(Role::Parent);
        let student = p(Role::Student);
        for status in [LinkStatus::Pending, LinkStatus::Rejected] {
            let edges = [RelationshipEdge::LinkedParent { status }];
            for cap in ALL {
                assert!(!PermissionResolver::can(&parent, &student, cap, &edges));
            }
        }
        let approved = [RelationshipEdge::LinkedParent { status: LinkStatus::Approved }];
        for cap in ALL {
            assert!(PermissionResolver::can(&parent, &student, cap, &approved));
        }
    }

    #[test]
    fn org_managed_resolves_through_org_role() {
        let advisor = Principal::org_managed(Uuid::new_v4(), Role::Advisor);
        let student = p(Role::Student);
        let edges = [RelationshipEdge::AdvisorAssignment { is_active: true }];
        assert!(PermissionResolver::can(&advisor, &student, Capability::ViewProfile, &edges));

        // Unresolved org_role fails closed, even with a live edge.
        let unresolved = Principal::new(Uuid::new_v4(), Role::OrgManaged);
        assert!(!PermissionResolver::can(&unresolved, &student, Capability::ViewProfile, &edges));
    }
}
