//! Invitation repository trait

use async_trait::async_trait;

use super::entity::Invitation;
use crate::domain::team::TeamId;
use crate::domain::DomainError;

/// Repository for managing invitations
#[async_trait]
pub trait InvitationRepository: Send + Sync + std::fmt::Debug {
    /// Look up an invitation by its opaque token
    async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, DomainError>;

    /// Find an unused, unexpired invitation for (email, team)
    async fn find_active(
        &self,
        email: &str,
        team_id: TeamId,
    ) -> Result<Option<Invitation>, DomainError>;

    /// Create a new invitation
    async fn create(&self, invitation: Invitation) -> Result<Invitation, DomainError>;

    /// All invitations issued for one team
    async fn list_for_team(&self, team_id: TeamId) -> Result<Vec<Invitation>, DomainError>;
}
