//! Team repository trait

use async_trait::async_trait;

use super::entity::{Team, TeamId};
use crate::domain::DomainError;

/// Repository for managing teams
///
/// Lookups return active rows only; soft-deleted teams stay reachable through
/// `get_including_deleted` for audit joins.
#[async_trait]
pub trait TeamRepository: Send + Sync + std::fmt::Debug {
    /// Get an active team by ID
    async fn get(&self, id: TeamId) -> Result<Option<Team>, DomainError>;

    /// Get an active team by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Team>, DomainError>;

    /// Get a team regardless of deletion state
    async fn get_including_deleted(&self, id: TeamId) -> Result<Option<Team>, DomainError>;

    /// Create a new team
    async fn create(&self, team: Team) -> Result<Team, DomainError>;

    /// Update an existing team
    async fn update(&self, team: &Team) -> Result<Team, DomainError>;

    /// Check if an active team uses the given slug
    async fn slug_exists(&self, slug: &str) -> Result<bool, DomainError>;
}
