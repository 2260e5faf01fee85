//! In-memory store implementation
//!
//! One struct implements every repository trait plus `TransactionalStore`.
//! Used as the test double and for embedded setups.
//!
//! Transaction semantics: `begin` takes ownership of the store-wide mutex
//! for the whole transaction, so transactions serialize - which is also the
//! in-memory rendition of the exclusive accounts-table lock. A snapshot
//! taken at `begin` is restored on `rollback`, and on drop when the
//! transaction was never committed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::account::{Account, AccountId, AccountRepository};
use crate::domain::audit::{AuditEntry, AuditRepository};
use crate::domain::invitation::{Invitation, InvitationId, InvitationRepository};
use crate::domain::membership::{Membership, MembershipId, MembershipRepository};
use crate::domain::store::{StoreTx, TransactionalStore};
use crate::domain::team::{Team, TeamId, TeamRepository};
use crate::domain::DomainError;

#[derive(Debug, Clone, Default)]
struct MemState {
    accounts: HashMap<Uuid, Account>,
    teams: HashMap<Uuid, Team>,
    memberships: HashMap<Uuid, Membership>,
    invitations: HashMap<Uuid, Invitation>,
    audit: Vec<AuditEntry>,
}

impl MemState {
    fn active_account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.is_active() && a.email() == email)
    }

    fn active_team_by_slug(&self, slug: &str) -> Option<&Team> {
        self.teams
            .values()
            .find(|t| t.is_active() && t.slug() == slug)
    }

    fn membership_for(&self, account_id: AccountId, team_id: TeamId) -> Option<&Membership> {
        self.memberships
            .values()
            .find(|m| m.account_id() == account_id && m.team_id() == team_id)
    }

    fn insert_account(&mut self, account: &Account) -> Result<(), DomainError> {
        if self.active_account_by_email(account.email()).is_some() {
            return Err(DomainError::conflict(format!(
                "Account with email '{}' already exists",
                account.email()
            )));
        }

        self.accounts
            .insert(account.id().as_uuid(), account.clone());
        Ok(())
    }

    fn insert_team(&mut self, team: &Team) -> Result<(), DomainError> {
        if self.active_team_by_slug(team.slug()).is_some() {
            return Err(DomainError::conflict(format!(
                "Team slug '{}' already exists",
                team.slug()
            )));
        }

        self.teams.insert(team.id().as_uuid(), team.clone());
        Ok(())
    }

    fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError> {
        if self
            .membership_for(membership.account_id(), membership.team_id())
            .is_some()
        {
            return Err(DomainError::conflict(
                "Account is already a member of this team",
            ));
        }

        self.memberships
            .insert(membership.id().as_uuid(), membership.clone());
        Ok(())
    }
}

/// In-memory implementation of every repository plus `TransactionalStore`
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemState>>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn get(&self, id: AccountId) -> Result<Option<Account>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .get(&id.as_uuid())
            .filter(|a| a.is_active())
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, DomainError> {
        let state = self.state.lock().await;
        Ok(state.active_account_by_email(email).cloned())
    }

    async fn get_including_deleted(
        &self,
        id: AccountId,
    ) -> Result<Option<Account>, DomainError> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(&id.as_uuid()).cloned())
    }

    async fn create(&self, account: Account) -> Result<Account, DomainError> {
        let mut state = self.state.lock().await;
        state.insert_account(&account)?;
        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<Account, DomainError> {
        let mut state = self.state.lock().await;

        if !state.accounts.contains_key(&account.id().as_uuid()) {
            return Err(DomainError::not_found(format!(
                "Account '{}' not found",
                account.id()
            )));
        }

        state
            .accounts
            .insert(account.id().as_uuid(), account.clone());
        Ok(account.clone())
    }

    async fn count_active(&self) -> Result<usize, DomainError> {
        let state = self.state.lock().await;
        Ok(state.accounts.values().filter(|a| a.is_active()).count())
    }
}

#[async_trait]
impl TeamRepository for InMemoryStore {
    async fn get(&self, id: TeamId) -> Result<Option<Team>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .teams
            .get(&id.as_uuid())
            .filter(|t| t.is_active())
            .cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Team>, DomainError> {
        let state = self.state.lock().await;
        Ok(state.active_team_by_slug(slug).cloned())
    }

    async fn get_including_deleted(&self, id: TeamId) -> Result<Option<Team>, DomainError> {
        let state = self.state.lock().await;
        Ok(state.teams.get(&id.as_uuid()).cloned())
    }

    async fn create(&self, team: Team) -> Result<Team, DomainError> {
        let mut state = self.state.lock().await;
        state.insert_team(&team)?;
        Ok(team)
    }

    async fn update(&self, team: &Team) -> Result<Team, DomainError> {
        let mut state = self.state.lock().await;

        if !state.teams.contains_key(&team.id().as_uuid()) {
            return Err(DomainError::not_found(format!(
                "Team '{}' not found",
                team.id()
            )));
        }

        state.teams.insert(team.id().as_uuid(), team.clone());
        Ok(team.clone())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, DomainError> {
        let state = self.state.lock().await;
        Ok(state.active_team_by_slug(slug).is_some())
    }
}

#[async_trait]
impl MembershipRepository for InMemoryStore {
    async fn get_for(
        &self,
        account_id: AccountId,
        team_id: TeamId,
    ) -> Result<Option<Membership>, DomainError> {
        let state = self.state.lock().await;
        Ok(state.membership_for(account_id, team_id).cloned())
    }

    async fn list_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Membership>, DomainError> {
        let state = self.state.lock().await;
        let mut result: Vec<Membership> = state
            .memberships
            .values()
            .filter(|m| m.account_id() == account_id)
            .cloned()
            .collect();
        result.sort_by_key(|m| m.created_at());
        Ok(result)
    }

    async fn list_for_team(&self, team_id: TeamId) -> Result<Vec<Membership>, DomainError> {
        let state = self.state.lock().await;
        let mut result: Vec<Membership> = state
            .memberships
            .values()
            .filter(|m| m.team_id() == team_id)
            .cloned()
            .collect();
        result.sort_by_key(|m| m.created_at());
        Ok(result)
    }

    async fn count_for_team(&self, team_id: TeamId) -> Result<usize, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .values()
            .filter(|m| m.team_id() == team_id)
            .count())
    }

    async fn create(&self, membership: Membership) -> Result<Membership, DomainError> {
        let mut state = self.state.lock().await;
        state.insert_membership(&membership)?;
        Ok(membership)
    }

    async fn update(&self, membership: &Membership) -> Result<Membership, DomainError> {
        let mut state = self.state.lock().await;

        if !state.memberships.contains_key(&membership.id().as_uuid()) {
            return Err(DomainError::not_found("Membership not found"));
        }

        state
            .memberships
            .insert(membership.id().as_uuid(), membership.clone());
        Ok(membership.clone())
    }

    async fn delete(&self, id: MembershipId) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        Ok(state.memberships.remove(&id.as_uuid()).is_some())
    }
}

#[async_trait]
impl InvitationRepository for InMemoryStore {
    async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .invitations
            .values()
            .find(|i| i.token() == token)
            .cloned())
    }

    async fn find_active(
        &self,
        email: &str,
        team_id: TeamId,
    ) -> Result<Option<Invitation>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .invitations
            .values()
            .find(|i| i.email() == email && i.team_id() == team_id && i.is_active())
            .cloned())
    }

    async fn create(&self, invitation: Invitation) -> Result<Invitation, DomainError> {
        let mut state = self.state.lock().await;
        state
            .invitations
            .insert(invitation.id().as_uuid(), invitation.clone());
        Ok(invitation)
    }

    async fn list_for_team(&self, team_id: TeamId) -> Result<Vec<Invitation>, DomainError> {
        let state = self.state.lock().await;
        let mut result: Vec<Invitation> = state
            .invitations
            .values()
            .filter(|i| i.team_id() == team_id)
            .cloned()
            .collect();
        result.sort_by_key(|i| i.created_at());
        Ok(result)
    }
}

#[async_trait]
impl AuditRepository for InMemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.audit.push(entry);
        Ok(())
    }

    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .audit
            .iter()
            .filter(|e| e.entity_type() == entity_type && e.entity_id() == entity_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DomainError> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();

        Ok(Box::new(InMemoryTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

/// A transaction over the in-memory store
///
/// Holds the store mutex for its entire lifetime. `snapshot` is `Some` while
/// the transaction is open; it is taken on commit and restored on rollback
/// or drop.
struct InMemoryTx {
    guard: OwnedMutexGuard<MemState>,
    snapshot: Option<MemState>,
}

impl Drop for InMemoryTx {
    fn drop(&mut self) {
        // An uncommitted transaction rolls back
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn lock_accounts(&mut self) -> Result<(), DomainError> {
        // The store mutex is already held exclusively for this transaction
        Ok(())
    }

    async fn count_active_accounts(&mut self) -> Result<usize, DomainError> {
        Ok(self.guard.accounts.values().filter(|a| a.is_active()).count())
    }

    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, DomainError> {
        Ok(self
            .guard
            .accounts
            .get(&id.as_uuid())
            .filter(|a| a.is_active())
            .cloned())
    }

    async fn find_account_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Account>, DomainError> {
        Ok(self.guard.active_account_by_email(email).cloned())
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), DomainError> {
        self.guard.insert_account(account)
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), DomainError> {
        if !self.guard.accounts.contains_key(&account.id().as_uuid()) {
            return Err(DomainError::not_found(format!(
                "Account '{}' not found",
                account.id()
            )));
        }

        self.guard
            .accounts
            .insert(account.id().as_uuid(), account.clone());
        Ok(())
    }

    async fn find_team(&mut self, id: TeamId) -> Result<Option<Team>, DomainError> {
        Ok(self
            .guard
            .teams
            .get(&id.as_uuid())
            .filter(|t| t.is_active())
            .cloned())
    }

    async fn find_team_by_slug(&mut self, slug: &str) -> Result<Option<Team>, DomainError> {
        Ok(self.guard.active_team_by_slug(slug).cloned())
    }

    async fn insert_team(&mut self, team: &Team) -> Result<(), DomainError> {
        self.guard.insert_team(team)
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError> {
        self.guard.insert_membership(membership)
    }

    async fn delete_membership(&mut self, id: MembershipId) -> Result<bool, DomainError> {
        Ok(self.guard.memberships.remove(&id.as_uuid()).is_some())
    }

    async fn find_invitation_by_token(
        &mut self,
        token: &str,
    ) -> Result<Option<Invitation>, DomainError> {
        Ok(self
            .guard
            .invitations
            .values()
            .find(|i| i.token() == token)
            .cloned())
    }

    async fn mark_invitation_used(
        &mut self,
        id: InvitationId,
        used_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let invitation = self
            .guard
            .invitations
            .get(&id.as_uuid())
            .cloned()
            .ok_or_else(|| DomainError::not_found("Invitation not found"))?;

        let updated = Invitation::from_storage(
            invitation.id(),
            invitation.email().to_string(),
            invitation.token().to_string(),
            invitation.team_id(),
            invitation.role(),
            invitation.invited_by(),
            invitation.message().map(str::to_string),
            invitation.expires_at(),
            Some(used_at),
            invitation.created_at(),
        );
        self.guard.invitations.insert(id.as_uuid(), updated);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        // Dropping the snapshot makes the writes permanent
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), DomainError> {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
        Ok(())
    }
}
