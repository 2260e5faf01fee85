//! Team entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{validate_team_name, validate_team_slug, TeamValidationError};

/// Team identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(Uuid);

impl TeamId {
    /// Generate a fresh team ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TeamId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Team entity - the unit of tenant isolation
///
/// Teams are never hard-deleted. Soft deletion is only permitted once no
/// active memberships remain, so ownership cannot silently evaporate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Unique identifier
    id: TeamId,
    /// URL-safe slug - unique among active teams
    slug: String,
    /// Display name
    name: String,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_at: Option<DateTime<Utc>>,
}

impl Team {
    /// Create a new team after validating slug and name
    pub fn new(
        id: TeamId,
        slug: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, TeamValidationError> {
        let slug = slug.into();
        let name = name.into();
        validate_team_slug(&slug)?;
        validate_team_name(&name)?;
        let now = Utc::now();

        Ok(Self {
            id,
            slug,
            name,
            description: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Restore a team from persisted state
    pub fn from_storage(
        id: TeamId,
        slug: String,
        name: String,
        description: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            slug,
            name,
            description,
            created_at,
            updated_at,
            deleted_at,
        }
    }

    /// Set description (builder pattern)
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    // Getters

    pub fn id(&self) -> TeamId {
        self.id
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
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

    /// Check if the team is active (not soft-deleted)
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    // Mutators

    /// Update the name
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), TeamValidationError> {
        let name = name.into();
        validate_team_name(&name)?;
        self.name = name;
        self.touch();
        Ok(())
    }

    /// Update the description
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    /// Mark the team as deleted. Idempotent.
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
