//! PostgreSQL store and transactions
//!
//! `PgStore` carries the connection pool and implements every repository
//! trait; `PgStoreTx` wraps one database transaction. The accounts-table
//! lock takes ACCESS EXCLUSIVE so concurrent signups serialize around the
//! first-account decision. Dropping an uncommitted `sqlx` transaction rolls
//! it back when the connection returns to the pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::account::{Account, AccountId};
use crate::domain::invitation::{Invitation, InvitationId};
use crate::domain::membership::{Membership, MembershipId};
use crate::domain::store::{StoreTx, TransactionalStore};
use crate::domain::team::{Team, TeamId};
use crate::domain::DomainError;

use super::rows::{
    map_write_error, platform_role_to_str, row_to_account, row_to_invitation, row_to_team,
};

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store around the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(super) fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), DomainError> {
        super::migrations::run_migrations(&self.pool).await
    }
}

#[async_trait]
impl TransactionalStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        Ok(Box::new(PgStoreTx { tx }))
    }
}

/// One open PostgreSQL transaction
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_accounts(&mut self) -> Result<(), DomainError> {
        sqlx::query("LOCK TABLE accounts IN ACCESS EXCLUSIVE MODE")
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to lock accounts: {}", e)))?;

        Ok(())
    }

    async fn count_active_accounts(&mut self) -> Result<usize, DomainError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE deleted_at IS NULL")
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to count accounts: {}", e)))?;

        Ok(count as usize)
    }

    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, display_name, platform_role,
                   primary_team_id, created_at, updated_at, deleted_at
            FROM accounts
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get account: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_account_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Account>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, display_name, platform_role,
                   primary_team_id, created_at, updated_at, deleted_at
            FROM accounts
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get account by email: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, password_hash, display_name, platform_role,
                                  primary_team_id, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(account.id().as_uuid())
        .bind(account.email())
        .bind(account.password_hash())
        .bind(account.display_name())
        .bind(platform_role_to_str(account.platform_role()))
        .bind(account.primary_team_id().map(|t| t.as_uuid()))
        .bind(account.created_at())
        .bind(account.updated_at())
        .bind(account.deleted_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                &format!("Account with email '{}' already exists", account.email()),
                "Failed to insert account",
            )
        })?;

        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET email = $2, password_hash = $3, display_name = $4, platform_role = $5,
                primary_team_id = $6, updated_at = $7, deleted_at = $8
            WHERE id = $1
            "#,
        )
        .bind(account.id().as_uuid())
        .bind(account.email())
        .bind(account.password_hash())
        .bind(account.display_name())
        .bind(platform_role_to_str(account.platform_role()))
        .bind(account.primary_team_id().map(|t| t.as_uuid()))
        .bind(account.updated_at())
        .bind(account.deleted_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update account: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Account '{}' not found",
                account.id()
            )));
        }

        Ok(())
    }

    async fn find_team(&mut self, id: TeamId) -> Result<Option<Team>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, slug, name, description, created_at, updated_at, deleted_at
            FROM teams
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get team: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_team(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_team_by_slug(&mut self, slug: &str) -> Result<Option<Team>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, slug, name, description, created_at, updated_at, deleted_at
            FROM teams
            WHERE slug = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(slug)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get team by slug: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_team(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert_team(&mut self, team: &Team) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO teams (id, slug, name, description, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(team.id().as_uuid())
        .bind(team.slug())
        .bind(team.name())
        .bind(team.description())
        .bind(team.created_at())
        .bind(team.updated_at())
        .bind(team.deleted_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                &format!("Team slug '{}' already exists", team.slug()),
                "Failed to insert team",
            )
        })?;

        Ok(())
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError> {
        super::repositories::insert_membership_query(membership)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                map_write_error(
                    e,
                    "Account is already a member of this team",
                    "Failed to insert membership",
                )
            })?;

        Ok(())
    }

    async fn delete_membership(&mut self, id: MembershipId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete membership: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_invitation_by_token(
        &mut self,
        token: &str,
    ) -> Result<Option<Invitation>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, token, team_id, role, invited_by, message,
                   expires_at, used_at, created_at
            FROM invitations
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get invitation: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_invitation(&row)?)),
            None => Ok(None),
        }
    }

    async fn mark_invitation_used(
        &mut self,
        id: InvitationId,
        used_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        // used_at is written exactly once
        let result = sqlx::query(
            "UPDATE invitations SET used_at = $2 WHERE id = $1 AND used_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(used_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to mark invitation used: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::conflict("Invitation has already been used"));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit transaction: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to roll back transaction: {}", e)))
    }
}
