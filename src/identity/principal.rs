use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed role set. `OrgManaged` principals carry a secondary `org_role`
/// that is their effective role for permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Parent,
    Advisor,
    Observer,
    OrgAdmin,
    Superadmin,
    OrgManaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    /// Effective role for `OrgManaged` principals; `None` otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_role: Option<Role>,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role, org_role: None }
    }

    pub fn org_managed(id: Uuid, org_role: Role) -> Self {
        Self { id, role: Role::OrgManaged, org_role: Some(org_role) }
    }

    /// The role capability checks evaluate against. `None` means an
    /// `OrgManaged` principal whose `org_role` was never resolved; such a
    /// principal must fail closed.
    pub fn effective_role(&self) -> Option<Role> {
        match self.role {
            Role::OrgManaged => self.org_role,
            role => Some(role),
        }
    }
}
