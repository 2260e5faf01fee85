//! Role authority - the centralized, pure authorization decision function
//!
//! Two independent privilege dimensions feed one decision: the platform role
//! (Admin bypasses team-ownership checks) and the caller's team role taken
//! from their memberships. Services consult this module before every
//! mutation; no boolean privilege checks live anywhere else.
//!
//! Tenant boundary: when a denial happens only because the resource belongs
//! to a team the principal is not in, the decision is `NotFound` - never
//! `Forbidden` - so callers cannot probe for resources across tenants.

use crate::domain::account::{AccountId, PlatformRole};
use crate::domain::membership::{Membership, TeamRole};
use crate::domain::team::TeamId;
use crate::domain::{Account, DomainError};

/// One membership as seen by the decision function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamGrant {
    pub team_id: TeamId,
    pub role: TeamRole,
}

/// The authenticated actor performing an action
#[derive(Debug, Clone)]
pub struct Principal {
    account_id: AccountId,
    platform_role: PlatformRole,
    grants: Vec<TeamGrant>,
}

impl Principal {
    pub fn new(
        account_id: AccountId,
        platform_role: PlatformRole,
        grants: Vec<TeamGrant>,
    ) -> Self {
        Self {
            account_id,
            platform_role,
            grants,
        }
    }

    /// Build a principal from an account and its memberships
    pub fn from_account(account: &Account, memberships: &[Membership]) -> Self {
        let grants = memberships
            .iter()
            .filter(|m| m.account_id() == account.id())
            .map(|m| TeamGrant {
                team_id: m.team_id(),
                role: m.role(),
            })
            .collect();

        Self {
            account_id: account.id(),
            platform_role: account.platform_role(),
            grants,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn platform_role(&self) -> PlatformRole {
        self.platform_role
    }

    pub fn is_platform_admin(&self) -> bool {
        self.platform_role.is_admin()
    }

    /// The principal's role in the given team, if any
    pub fn role_in(&self, team_id: TeamId) -> Option<TeamRole> {
        self.grants
            .iter()
            .find(|g| g.team_id == team_id)
            .map(|g| g.role)
    }
}

/// Action on a team-scoped resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// The team-scoped resource being acted on
#[derive(Debug, Clone, Copy)]
pub struct ResourceScope {
    /// Owning team of the resource
    pub team_id: TeamId,
    /// Creator of the resource, when the resource tracks one
    pub created_by: Option<AccountId>,
}

impl ResourceScope {
    pub fn team(team_id: TeamId) -> Self {
        Self {
            team_id,
            created_by: None,
        }
    }

    pub fn created(team_id: TeamId, created_by: AccountId) -> Self {
        Self {
            team_id,
            created_by: Some(created_by),
        }
    }
}

/// Outcome of an authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Denied because the resource lives in a foreign tenant
    NotFound,
    /// Denied on privilege within the caller's own tenant
    Forbidden,
}

impl Decision {
    /// Turn a denial into the corresponding domain error
    pub fn require(self, what: &str) -> Result<(), DomainError> {
        match self {
            Self::Allow => Ok(()),
            Self::NotFound => Err(DomainError::not_found(format!("{} not found", what))),
            Self::Forbidden => Err(DomainError::forbidden(format!(
                "Insufficient privileges for {}",
                what
            ))),
        }
    }
}

/// Decide whether the principal may perform `action` on `resource`
pub fn decide(principal: &Principal, action: Action, resource: &ResourceScope) -> Decision {
    if principal.is_platform_admin() {
        return Decision::Allow;
    }

    let role = match principal.role_in(resource.team_id) {
        Some(role) => role,
        // Foreign tenant: the resource must appear not to exist
        None => return Decision::NotFound,
    };

    match action {
        Action::Read => Decision::Allow,
        Action::Create => {
            if role.is_owner() {
                Decision::Allow
            } else {
                Decision::Forbidden
            }
        }
        Action::Update | Action::Delete => {
            if role.is_owner() || resource.created_by == Some(principal.account_id) {
                Decision::Allow
            } else {
                Decision::Forbidden
            }
        }
    }
}

/// Decide whether the principal may change a membership's role
///
/// The self-demotion guard comes first: an Owner dropping their own role to
/// Member is always Forbidden, even for platform admins - ownership must be
/// transferred, not dropped.
pub fn decide_role_change(
    principal: &Principal,
    team_id: TeamId,
    target: AccountId,
    target_role: TeamRole,
    new_role: TeamRole,
) -> Decision {
    if principal.account_id == target
        && target_role == TeamRole::Owner
        && new_role == TeamRole::Member
    {
        return Decision::Forbidden;
    }

    if principal.is_platform_admin() {
        return Decision::Allow;
    }

    match principal.role_in(team_id) {
        Some(TeamRole::Owner) => Decision::Allow,
        Some(TeamRole::Member) => Decision::Forbidden,
        None => Decision::NotFound,
    }
}

/// Only platform admins may grant the platform Admin role
pub fn can_grant_platform_admin(principal: &Principal) -> bool {
    principal.is_platform_admin()
}
