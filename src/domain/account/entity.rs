//! Account entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::team::TeamId;

/// Account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a fresh account ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AccountId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform-wide privilege level, independent of any team role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlatformRole {
    /// Regular platform user
    #[default]
    User,
    /// Platform administrator - bypasses team-ownership checks
    Admin,
}

impl PlatformRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for PlatformRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Account entity
///
/// Accounts are soft-deleted: a set `deleted_at` makes the row invisible to
/// normal lookups and blocks authentication, but the row is never purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    id: AccountId,
    /// Login email - unique among active accounts
    email: String,
    /// Argon2 password hash - never exposed in serialization
    #[serde(skip_serializing)]
    password_hash: String,
    /// Display name shown to other members
    display_name: String,
    /// Platform-wide role
    platform_role: PlatformRole,
    /// The team this account primarily belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_team_id: Option<TeamId>,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a new active account with the default platform role
    pub fn new(
        id: AccountId,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            email: email.into(),
            password_hash: password_hash.into(),
            display_name: display_name.into(),
            platform_role: PlatformRole::User,
            primary_team_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Restore an account from persisted state
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        id: AccountId,
        email: String,
        password_hash: String,
        display_name: String,
        platform_role: PlatformRole,
        primary_team_id: Option<TeamId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            email,
            password_hash,
            display_name,
            platform_role,
            primary_team_id,
            created_at,
            updated_at,
            deleted_at,
        }
    }

    // Getters

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn platform_role(&self) -> PlatformRole {
        self.platform_role
    }

    pub fn primary_team_id(&self) -> Option<TeamId> {
        self.primary_team_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Check if the account is active (not soft-deleted)
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_platform_admin(&self) -> bool {
        self.platform_role.is_admin()
    }

    // Mutators

    pub fn set_platform_role(&mut self, role: PlatformRole) {
        self.platform_role = role;
        self.touch();
    }

    pub fn set_primary_team(&mut self, team_id: Option<TeamId>) {
        self.primary_team_id = team_id;
        self.touch();
    }

    pub fn set_password_hash(&mut self, password_hash: impl Into<String>) {
        self.password_hash = password_hash.into();
        self.touch();
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
        self.touch();
    }

    /// Mark the account as deleted. Idempotent.
    pub fn soft_delete(&mut self) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(Utc::now());
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
