//! Membership repository trait

use async_trait::async_trait;

use super::entity::{Membership, MembershipId};
use crate::domain::account::AccountId;
use crate::domain::team::TeamId;
use crate::domain::DomainError;

/// Repository for managing memberships
///
/// Memberships are hard-deleted on removal; the audit log keeps the history.
#[async_trait]
pub trait MembershipRepository: Send + Sync + std::fmt::Debug {
    /// Get the membership linking an account to a team
    async fn get_for(
        &self,
        account_id: AccountId,
        team_id: TeamId,
    ) -> Result<Option<Membership>, DomainError>;

    /// All memberships of one account
    async fn list_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Membership>, DomainError>;

    /// All memberships of one team
    async fn list_for_team(&self, team_id: TeamId) -> Result<Vec<Membership>, DomainError>;

    /// Count memberships of one team
    async fn count_for_team(&self, team_id: TeamId) -> Result<usize, DomainError>;

    /// Create a new membership
    async fn create(&self, membership: Membership) -> Result<Membership, DomainError>;

    /// Update an existing membership
    async fn update(&self, membership: &Membership) -> Result<Membership, DomainError>;

    /// Remove a membership
    async fn delete(&self, id: MembershipId) -> Result<bool, DomainError>;
}
