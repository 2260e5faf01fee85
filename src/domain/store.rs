//! Transactional store traits
//!
//! The three multi-step mutations (bootstrap signup, team creation with
//! ownership, invitation acceptance) run inside a single ACID transaction.
//! `StoreTx` exposes exactly the row operations those flows need, plus the
//! exclusive accounts-table lock that serializes the "am I the first
//! account" decision. Dropping an uncommitted transaction rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::account::{Account, AccountId};
use crate::domain::invitation::{Invitation, InvitationId};
use crate::domain::membership::{Membership, MembershipId};
use crate::domain::team::{Team, TeamId};
use crate::domain::DomainError;

/// A store that can open transactions
#[async_trait]
pub trait TransactionalStore: Send + Sync + std::fmt::Debug {
    /// Begin a new transaction
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DomainError>;
}

/// One open transaction
///
/// All reads observe the transaction's own uncommitted writes. Every method
/// failure leaves the transaction usable only for `rollback`.
#[async_trait]
pub trait StoreTx: Send {
    /// Take an exclusive table-level lock on accounts, held until the
    /// transaction ends
    async fn lock_accounts(&mut self) -> Result<(), DomainError>;

    /// Count active accounts
    async fn count_active_accounts(&mut self) -> Result<usize, DomainError>;

    /// Find an active account by ID
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, DomainError>;

    /// Find an active account by email
    async fn find_account_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Account>, DomainError>;

    /// Insert an account
    async fn insert_account(&mut self, account: &Account) -> Result<(), DomainError>;

    /// Update an account
    async fn update_account(&mut self, account: &Account) -> Result<(), DomainError>;

    /// Find an active team by ID
    async fn find_team(&mut self, id: TeamId) -> Result<Option<Team>, DomainError>;

    /// Find an active team by slug
    async fn find_team_by_slug(&mut self, slug: &str) -> Result<Option<Team>, DomainError>;

    /// Insert a team
    async fn insert_team(&mut self, team: &Team) -> Result<(), DomainError>;

    /// Insert a membership
    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError>;

    /// Delete a membership row
    async fn delete_membership(&mut self, id: MembershipId) -> Result<bool, DomainError>;

    /// Find an invitation by token
    async fn find_invitation_by_token(
        &mut self,
        token: &str,
    ) -> Result<Option<Invitation>, DomainError>;

    /// Mark an invitation used
    async fn mark_invitation_used(
        &mut self,
        id: InvitationId,
        used_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Roll the transaction back, discarding every write
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}
