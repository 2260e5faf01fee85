//! Membership entity and the team-scoped role

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::team::TeamId;

/// Membership identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MembershipId(Uuid);

impl MembershipId {
    /// Generate a fresh membership ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MembershipId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for MembershipId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MembershipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of an account within one team
///
/// This is the second privilege dimension, independent of `PlatformRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    /// Full control over the team, including member management
    Owner,
    /// Regular team member
    #[default]
    Member,
}

impl TeamRole {
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Member => write!(f, "member"),
        }
    }
}

/// Membership entity - one account's role in one team
///
/// The (account, team) pair is unique. A team may have several Owners, but
/// the normal team-creation path starts with exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Unique identifier
    id: MembershipId,
    /// The member account
    account_id: AccountId,
    /// The team
    team_id: TeamId,
    /// Role within the team
    role: TeamRole,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
}

impl Membership {
    /// Create a new membership
    pub fn new(account_id: AccountId, team_id: TeamId, role: TeamRole) -> Self {
        let now = Utc::now();

        Self {
            id: MembershipId::new(),
            account_id,
            team_id,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Restore a membership from persisted state
    pub fn from_storage(
        id: MembershipId,
        account_id: AccountId,
        team_id: TeamId,
        role: TeamRole,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            team_id,
            role,
            created_at,
            updated_at,
        }
    }

    // Getters

    pub fn id(&self) -> MembershipId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    pub fn role(&self) -> TeamRole {
        self.role
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Mutators

    /// Update the role
    pub fn set_role(&mut self, role: TeamRole) {
        self.role = role;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_role() {
        assert!(TeamRole::Owner.is_owner());
        assert!(!TeamRole::Member.is_owner());
        assert_eq!(TeamRole::Owner.to_string(), "owner");
        assert_eq!(TeamRole::Member.to_string(), "member");
    }

    #[test]
    fn test_membership_creation() {
        let account_id = AccountId::new();
        let team_id = TeamId::new();
        let membership = Membership::new(account_id, team_id, TeamRole::Owner);

        assert_eq!(membership.account_id(), account_id);
        assert_eq!(membership.team_id(), team_id);
        assert_eq!(membership.role(), TeamRole::Owner);
    }

    #[test]
    fn test_membership_set_role() {
        let mut membership = Membership::new(AccountId::new(), TeamId::new(), TeamRole::Member);

        membership.set_role(TeamRole::Owner);
        assert_eq!(membership.role(), TeamRole::Owner);
    }
}
