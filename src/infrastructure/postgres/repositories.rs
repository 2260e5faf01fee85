//! PostgreSQL repository implementations
//!
//! All lookups filter soft-deleted rows out unless the method name says
//! otherwise. Uniqueness (active email, active slug, membership pair) is
//! enforced by database constraints and surfaced as conflicts.

use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use crate::domain::account::{Account, AccountId, AccountRepository};
use crate::domain::audit::{AuditEntry, AuditRepository};
use crate::domain::invitation::{Invitation, InvitationRepository};
use crate::domain::membership::{Membership, MembershipId, MembershipRepository};
use crate::domain::team::{Team, TeamId, TeamRepository};
use crate::domain::DomainError;

use super::rows::{
    map_write_error, platform_role_to_str, row_to_account, row_to_audit_entry,
    row_to_invitation, row_to_membership, row_to_team, team_role_to_str,
};
use super::store::PgStore;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, display_name, platform_role, \
                               primary_team_id, created_at, updated_at, deleted_at";
const TEAM_COLUMNS: &str = "id, slug, name, description, created_at, updated_at, deleted_at";
const MEMBERSHIP_COLUMNS: &str = "id, account_id, team_id, role, created_at, updated_at";
const INVITATION_COLUMNS: &str = "id, email, token, team_id, role, invited_by, message, \
                                  expires_at, used_at, created_at";

pub(super) fn insert_membership_query(
    membership: &Membership,
) -> Query<'static, Postgres, PgArguments> {
    sqlx::query(
        r#"
        INSERT INTO memberships (id, account_id, team_id, role, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(membership.id().as_uuid())
    .bind(membership.account_id().as_uuid())
    .bind(membership.team_id().as_uuid())
    .bind(team_role_to_str(membership.role()))
    .bind(membership.created_at())
    .bind(membership.updated_at())
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn get(&self, id: AccountId) -> Result<Option<Account>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = $1 AND deleted_at IS NULL",
            ACCOUNT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get account: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE email = $1 AND deleted_at IS NULL",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get account by email: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_including_deleted(
        &self,
        id: AccountId,
    ) -> Result<Option<Account>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get account: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, account: Account) -> Result<Account, DomainError> {
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
        .execute(self.pool())
        .await
        .map_err(|e| {
            map_write_error(
                e,
                &format!("Account with email '{}' already exists", account.email()),
                "Failed to create account",
            )
        })?;

        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<Account, DomainError> {
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
        .execute(self.pool())
        .await
        .map_err(|e| {
            map_write_error(
                e,
                &format!("Account with email '{}' already exists", account.email()),
                "Failed to update account",
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Account '{}' not found",
                account.id()
            )));
        }

        Ok(account.clone())
    }

    async fn count_active(&self) -> Result<usize, DomainError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE deleted_at IS NULL")
                .fetch_one(self.pool())
                .await
                .map_err(|e| DomainError::storage(format!("Failed to count accounts: {}", e)))?;

        Ok(count as usize)
    }
}

#[async_trait]
impl TeamRepository for PgStore {
    async fn get(&self, id: TeamId) -> Result<Option<Team>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM teams WHERE id = $1 AND deleted_at IS NULL",
            TEAM_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get team: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_team(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Team>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM teams WHERE slug = $1 AND deleted_at IS NULL",
            TEAM_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get team by slug: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_team(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_including_deleted(&self, id: TeamId) -> Result<Option<Team>, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM teams WHERE id = $1", TEAM_COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get team: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_team(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, team: Team) -> Result<Team, DomainError> {
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
        .execute(self.pool())
        .await
        .map_err(|e| {
            map_write_error(
                e,
                &format!("Team slug '{}' already exists", team.slug()),
                "Failed to create team",
            )
        })?;

        Ok(team)
    }

    async fn update(&self, team: &Team) -> Result<Team, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE teams
            SET slug = $2, name = $3, description = $4, updated_at = $5, deleted_at = $6
            WHERE id = $1
            "#,
        )
        .bind(team.id().as_uuid())
        .bind(team.slug())
        .bind(team.name())
        .bind(team.description())
        .bind(team.updated_at())
        .bind(team.deleted_at())
        .execute(self.pool())
        .await
        .map_err(|e| {
            map_write_error(
                e,
                &format!("Team slug '{}' already exists", team.slug()),
                "Failed to update team",
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Team '{}' not found",
                team.id()
            )));
        }

        Ok(team.clone())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, DomainError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM teams WHERE slug = $1 AND deleted_at IS NULL",
        )
        .bind(slug)
        .fetch_one(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to check slug: {}", e)))?;

        Ok(count > 0)
    }
}

#[async_trait]
impl MembershipRepository for PgStore {
    async fn get_for(
        &self,
        account_id: AccountId,
        team_id: TeamId,
    ) -> Result<Option<Membership>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM memberships WHERE account_id = $1 AND team_id = $2",
            MEMBERSHIP_COLUMNS
        ))
        .bind(account_id.as_uuid())
        .bind(team_id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get membership: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_membership(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Membership>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM memberships WHERE account_id = $1 ORDER BY created_at",
            MEMBERSHIP_COLUMNS
        ))
        .bind(account_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list memberships: {}", e)))?;

        let mut memberships = Vec::with_capacity(rows.len());
        for row in rows {
            memberships.push(row_to_membership(&row)?);
        }

        Ok(memberships)
    }

    async fn list_for_team(&self, team_id: TeamId) -> Result<Vec<Membership>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM memberships WHERE team_id = $1 ORDER BY created_at",
            MEMBERSHIP_COLUMNS
        ))
        .bind(team_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list memberships: {}", e)))?;

        let mut memberships = Vec::with_capacity(rows.len());
        for row in rows {
            memberships.push(row_to_membership(&row)?);
        }

        Ok(memberships)
    }

    async fn count_for_team(&self, team_id: TeamId) -> Result<usize, DomainError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE team_id = $1")
                .bind(team_id.as_uuid())
                .fetch_one(self.pool())
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to count memberships: {}", e))
                })?;

        Ok(count as usize)
    }

    async fn create(&self, membership: Membership) -> Result<Membership, DomainError> {
        insert_membership_query(&membership)
            .execute(self.pool())
            .await
            .map_err(|e| {
                map_write_error(
                    e,
                    "Account is already a member of this team",
                    "Failed to create membership",
                )
            })?;

        Ok(membership)
    }

    async fn update(&self, membership: &Membership) -> Result<Membership, DomainError> {
        let result = sqlx::query(
            "UPDATE memberships SET role = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(membership.id().as_uuid())
        .bind(team_role_to_str(membership.role()))
        .bind(membership.updated_at())
        .execute(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update membership: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Membership not found"));
        }

        Ok(membership.clone())
    }

    async fn delete(&self, id: MembershipId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool())
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete membership: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl InvitationRepository for PgStore {
    async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM invitations WHERE token = $1",
            INVITATION_COLUMNS
        ))
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get invitation: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_invitation(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_active(
        &self,
        email: &str,
        team_id: TeamId,
    ) -> Result<Option<Invitation>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM invitations \
             WHERE email = $1 AND team_id = $2 AND used_at IS NULL AND expires_at > NOW()",
            INVITATION_COLUMNS
        ))
        .bind(email)
        .bind(team_id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to find invitation: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_invitation(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, invitation: Invitation) -> Result<Invitation, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO invitations (id, email, token, team_id, role, invited_by, message,
                                     expires_at, used_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(invitation.id().as_uuid())
        .bind(invitation.email())
        .bind(invitation.token())
        .bind(invitation.team_id().as_uuid())
        .bind(team_role_to_str(invitation.role()))
        .bind(invitation.invited_by().as_uuid())
        .bind(invitation.message())
        .bind(invitation.expires_at())
        .bind(invitation.used_at())
        .bind(invitation.created_at())
        .execute(self.pool())
        .await
        .map_err(|e| {
            map_write_error(
                e,
                "An invitation with this token already exists",
                "Failed to create invitation",
            )
        })?;

        Ok(invitation)
    }

    async fn list_for_team(&self, team_id: TeamId) -> Result<Vec<Invitation>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM invitations WHERE team_id = $1 ORDER BY created_at",
            INVITATION_COLUMNS
        ))
        .bind(team_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list invitations: {}", e)))?;

        let mut invitations = Vec::with_capacity(rows.len());
        for row in rows {
            invitations.push(row_to_invitation(&row)?);
        }

        Ok(invitations)
    }
}

#[async_trait]
impl AuditRepository for PgStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, action, actor_id, entity_type, entity_id,
                                   metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id())
        .bind(entry.action().as_str())
        .bind(entry.actor_id().map(|a| a.as_uuid()))
        .bind(entry.entity_type())
        .bind(entry.entity_id())
        .bind(entry.metadata())
        .bind(entry.created_at())
        .execute(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to append audit entry: {}", e)))?;

        Ok(())
    }

    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, action, actor_id, entity_type, entity_id, metadata, created_at
            FROM audit_log
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list audit entries: {}", e)))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(row_to_audit_entry(&row)?);
        }

        Ok(entries)
    }
}
