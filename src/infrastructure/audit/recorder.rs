//! Best-effort audit recorder
//!
//! Recording happens after the business operation commits and must never
//! influence its outcome: every persistence failure is logged and swallowed.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::domain::account::{AccountId, PlatformRole};
use crate::domain::audit::{AuditAction, AuditEntry, AuditRepository};
use crate::domain::membership::TeamRole;
use crate::domain::team::TeamId;

/// Fire-and-forget compliance log
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    repository: Arc<dyn AuditRepository>,
}

impl AuditRecorder {
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Record an entry. Failures are logged, never propagated.
    pub async fn record(
        &self,
        action: AuditAction,
        actor_id: Option<AccountId>,
        entity_type: &str,
        entity_id: &str,
        metadata: serde_json::Value,
    ) {
        let entry = AuditEntry::new(action, actor_id, entity_type, entity_id, metadata);

        if let Err(e) = self.repository.append(entry).await {
            warn!(
                action = %action,
                entity_type = entity_type,
                entity_id = entity_id,
                error = %e,
                "Failed to record audit entry"
            );
        }
    }

    /// A platform role changed, with before/after values
    pub async fn platform_role_changed(
        &self,
        actor_id: Option<AccountId>,
        account_id: AccountId,
        old_role: PlatformRole,
        new_role: PlatformRole,
    ) {
        self.record(
            AuditAction::PlatformRoleChanged,
            actor_id,
            "account",
            &account_id.to_string(),
            json!({
                "old_role": old_role.to_string(),
                "new_role": new_role.to_string(),
            }),
        )
        .await;
    }

    /// A membership role changed, with before/after values
    pub async fn membership_role_changed(
        &self,
        actor_id: Option<AccountId>,
        account_id: AccountId,
        team_id: TeamId,
        old_role: TeamRole,
        new_role: TeamRole,
    ) {
        self.record(
            AuditAction::MembershipRoleChanged,
            actor_id,
            "membership",
            &format!("{}:{}", team_id, account_id),
            json!({
                "account_id": account_id.to_string(),
                "team_id": team_id.to_string(),
                "old_role": old_role.to_string(),
                "new_role": new_role.to_string(),
            }),
        )
        .await;
    }

    /// A team assignment changed (primary team moved)
    pub async fn assignment_changed(
        &self,
        actor_id: Option<AccountId>,
        account_id: AccountId,
        old_team: Option<TeamId>,
        new_team: Option<TeamId>,
    ) {
        self.record(
            AuditAction::AssignmentChanged,
            actor_id,
            "account",
            &account_id.to_string(),
            json!({
                "old_team": old_team.map(|t| t.to_string()),
                "new_team": new_team.map(|t| t.to_string()),
            }),
        )
        .await;
    }

    /// Something was (soft-)deleted
    pub async fn deleted(
        &self,
        action: AuditAction,
        actor_id: Option<AccountId>,
        entity_type: &str,
        entity_id: &str,
        metadata: serde_json::Value,
    ) {
        self.record(action, actor_id, entity_type, entity_id, metadata)
            .await;
    }
}
