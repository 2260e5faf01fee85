//! Invitation entity and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::membership::TeamRole;
use crate::domain::team::TeamId;

/// Invitation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvitationId(Uuid);

impl InvitationId {
    /// Generate a fresh invitation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InvitationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for InvitationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for InvitationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Invitation entity
///
/// The token is an opaque random credential carrying no embedded claims. It
/// is single-use: `used_at` is set exactly once, and a used or expired
/// invitation never validates again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    /// Unique identifier
    id: InvitationId,
    /// Invited email address
    email: String,
    /// Opaque random token - never exposed in serialization
    #[serde(skip_serializing)]
    token: String,
    /// Team the invitee will join
    team_id: TeamId,
    /// Role the invitee will receive
    role: TeamRole,
    /// Account that issued the invitation
    invited_by: AccountId,
    /// Optional personal message from the inviter
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    /// Expiry timestamp
    expires_at: DateTime<Utc>,
    /// Set when the invitation is consumed
    #[serde(skip_serializing_if = "Option::is_none")]
    used_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    created_at: DateTime<Utc>,
}

impl Invitation {
    /// Create a new invitation valid for `ttl` from now
    pub fn new(
        email: impl Into<String>,
        token: impl Into<String>,
        team_id: TeamId,
        role: TeamRole,
        invited_by: AccountId,
        message: Option<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: InvitationId::new(),
            email: email.into(),
            token: token.into(),
            team_id,
            role,
            invited_by,
            message,
            expires_at: now + ttl,
            used_at: None,
            created_at: now,
        }
    }

    /// Restore an invitation from persisted state
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        id: InvitationId,
        email: String,
        token: String,
        team_id: TeamId,
        role: TeamRole,
        invited_by: AccountId,
        message: Option<String>,
        expires_at: DateTime<Utc>,
        used_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            token,
            team_id,
            role,
            invited_by,
            message,
            expires_at,
            used_at,
            created_at,
        }
    }

    // Getters

    pub fn id(&self) -> InvitationId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    pub fn role(&self) -> TeamRole {
        self.role
    }

    pub fn invited_by(&self) -> AccountId {
        self.invited_by
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn used_at(&self) -> Option<DateTime<Utc>> {
        self.used_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // Status checks

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Active means unused and unexpired
    pub fn is_active(&self) -> bool {
        !self.is_used() && !self.is_expired()
    }
}
