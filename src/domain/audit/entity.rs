//! Audit entry entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountId;

/// What happened, for forensic reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AccountCreated,
    AccountDeactivated,
    PlatformRoleChanged,
    TeamCreated,
    TeamDeleted,
    MemberAdded,
    MemberRemoved,
    MembershipRoleChanged,
    AssignmentChanged,
    InvitationCreated,
    InvitationAccepted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountCreated => "account_created",
            Self::AccountDeactivated => "account_deactivated",
            Self::PlatformRoleChanged => "platform_role_changed",
            Self::TeamCreated => "team_created",
            Self::TeamDeleted => "team_deleted",
            Self::MemberAdded => "member_added",
            Self::MemberRemoved => "member_removed",
            Self::MembershipRoleChanged => "membership_role_changed",
            Self::AssignmentChanged => "assignment_changed",
            Self::InvitationCreated => "invitation_created",
            Self::InvitationAccepted => "invitation_accepted",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only audit entry
///
/// `actor_id` is nullable: bootstrap signup has no authenticated actor yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    id: Uuid,
    action: AuditAction,
    actor_id: Option<AccountId>,
    entity_type: String,
    entity_id: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        actor_id: Option<AccountId>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            actor_id,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Restore an entry from persisted state
    pub fn from_storage(
        id: Uuid,
        action: AuditAction,
        actor_id: Option<AccountId>,
        entity_type: String,
        entity_id: String,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            action,
            actor_id,
            entity_type,
            entity_id,
            metadata,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn actor_id(&self) -> Option<AccountId> {
        self.actor_id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
