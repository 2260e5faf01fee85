//! Row-to-entity mapping for the PostgreSQL store

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::account::{Account, AccountId, PlatformRole};
use crate::domain::audit::{AuditAction, AuditEntry};
use crate::domain::invitation::{Invitation, InvitationId};
use crate::domain::membership::{Membership, MembershipId, TeamRole};
use crate::domain::team::{Team, TeamId};
use crate::domain::DomainError;

pub(super) fn platform_role_to_str(role: PlatformRole) -> &'static str {
    match role {
        PlatformRole::User => "user",
        PlatformRole::Admin => "admin",
    }
}

pub(super) fn parse_platform_role(value: &str) -> Result<PlatformRole, DomainError> {
    match value {
        "user" => Ok(PlatformRole::User),
        "admin" => Ok(PlatformRole::Admin),
        other => Err(DomainError::storage(format!(
            "Unknown platform role in storage: '{}'",
            other
        ))),
    }
}

pub(super) fn team_role_to_str(role: TeamRole) -> &'static str {
    match role {
        TeamRole::Owner => "owner",
        TeamRole::Member => "member",
    }
}

pub(super) fn parse_team_role(value: &str) -> Result<TeamRole, DomainError> {
    match value {
        "owner" => Ok(TeamRole::Owner),
        "member" => Ok(TeamRole::Member),
        other => Err(DomainError::storage(format!(
            "Unknown team role in storage: '{}'",
            other
        ))),
    }
}

pub(super) fn parse_audit_action(value: &str) -> Result<AuditAction, DomainError> {
    match value {
        "account_created" => Ok(AuditAction::AccountCreated),
        "account_deactivated" => Ok(AuditAction::AccountDeactivated),
        "platform_role_changed" => Ok(AuditAction::PlatformRoleChanged),
        "team_created" => Ok(AuditAction::TeamCreated),
        "team_deleted" => Ok(AuditAction::TeamDeleted),
        "member_added" => Ok(AuditAction::MemberAdded),
        "member_removed" => Ok(AuditAction::MemberRemoved),
        "membership_role_changed" => Ok(AuditAction::MembershipRoleChanged),
        "assignment_changed" => Ok(AuditAction::AssignmentChanged),
        "invitation_created" => Ok(AuditAction::InvitationCreated),
        "invitation_accepted" => Ok(AuditAction::InvitationAccepted),
        other => Err(DomainError::storage(format!(
            "Unknown audit action in storage: '{}'",
            other
        ))),
    }
}

pub(super) fn row_to_account(row: &PgRow) -> Result<Account, DomainError> {
    let id: Uuid = row.get("id");
    let platform_role: String = row.get("platform_role");
    let primary_team_id: Option<Uuid> = row.get("primary_team_id");

    Ok(Account::from_storage(
        AccountId::from(id),
        row.get("email"),
        row.get("password_hash"),
        row.get("display_name"),
        parse_platform_role(&platform_role)?,
        primary_team_id.map(TeamId::from),
        row.get("created_at"),
        row.get("updated_at"),
        row.get("deleted_at"),
    ))
}

pub(super) fn row_to_team(row: &PgRow) -> Result<Team, DomainError> {
    let id: Uuid = row.get("id");

    Ok(Team::from_storage(
        TeamId::from(id),
        row.get("slug"),
        row.get("name"),
        row.get("description"),
        row.get("created_at"),
        row.get("updated_at"),
        row.get("deleted_at"),
    ))
}

pub(super) fn row_to_membership(row: &PgRow) -> Result<Membership, DomainError> {
    let id: Uuid = row.get("id");
    let account_id: Uuid = row.get("account_id");
    let team_id: Uuid = row.get("team_id");
    let role: String = row.get("role");

    Ok(Membership::from_storage(
        MembershipId::from(id),
        AccountId::from(account_id),
        TeamId::from(team_id),
        parse_team_role(&role)?,
        row.get("created_at"),
        row.get("updated_at"),
    ))
}

pub(super) fn row_to_invitation(row: &PgRow) -> Result<Invitation, DomainError> {
    let id: Uuid = row.get("id");
    let team_id: Uuid = row.get("team_id");
    let role: String = row.get("role");
    let invited_by: Uuid = row.get("invited_by");

    Ok(Invitation::from_storage(
        InvitationId::from(id),
        row.get("email"),
        row.get("token"),
        TeamId::from(team_id),
        parse_team_role(&role)?,
        AccountId::from(invited_by),
        row.get("message"),
        row.get("expires_at"),
        row.get("used_at"),
        row.get("created_at"),
    ))
}

pub(super) fn row_to_audit_entry(row: &PgRow) -> Result<AuditEntry, DomainError> {
    let id: Uuid = row.get("id");
    let action: String = row.get("action");
    let actor_id: Option<Uuid> = row.get("actor_id");
    let created_at: DateTime<Utc> = row.get("created_at");

    Ok(AuditEntry::from_storage(
        id,
        parse_audit_action(&action)?,
        actor_id.map(AccountId::from),
        row.get("entity_type"),
        row.get("entity_id"),
        row.get("metadata"),
        created_at,
    ))
}

/// Map a write error, turning unique-constraint violations into conflicts
pub(super) fn map_write_error(e: sqlx::Error, conflict_message: &str, context: &str) -> DomainError {
    let msg = e.to_string();

    if msg.contains("duplicate key") || msg.contains("unique constraint") {
        DomainError::conflict(conflict_message.to_string())
    } else {
        DomainError::storage(format!("{}: {}", context, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips() {
        for role in [PlatformRole::User, PlatformRole::Admin] {
            assert_eq!(parse_platform_role(platform_role_to_str(role)).unwrap(), role);
        }
        for role in [TeamRole::Owner, TeamRole::Member] {
            assert_eq!(parse_team_role(team_role_to_str(role)).unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_is_storage_error() {
        assert!(parse_platform_role("superuser").is_err());
        assert!(parse_team_role("god").is_err());
        assert!(parse_audit_action("something_else").is_err());
    }

    #[test]
    fn test_audit_action_round_trips() {
        for action in [
            AuditAction::AccountCreated,
            AuditAction::MembershipRoleChanged,
            AuditAction::InvitationAccepted,
        ] {
            assert_eq!(parse_audit_action(action.as_str()).unwrap(), action);
        }
    }
}
