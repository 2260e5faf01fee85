//! Account repository trait

use async_trait::async_trait;

use super::entity::{Account, AccountId};
use crate::domain::DomainError;

/// Repository for managing accounts
///
/// Lookups return active rows only; soft-deleted accounts are invisible
/// unless the `_including_deleted` variant is used (audit joins).
#[async_trait]
pub trait AccountRepository: Send + Sync + std::fmt::Debug {
    /// Get an active account by ID
    async fn get(&self, id: AccountId) -> Result<Option<Account>, DomainError>;

    /// Get an active account by email
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, DomainError>;

    /// Get an account regardless of deletion state
    async fn get_including_deleted(&self, id: AccountId)
        -> Result<Option<Account>, DomainError>;

    /// Create a new account
    async fn create(&self, account: Account) -> Result<Account, DomainError>;

    /// Update an existing account
    async fn update(&self, account: &Account) -> Result<Account, DomainError>;

    /// Count active accounts
    async fn count_active(&self) -> Result<usize, DomainError>;
}
