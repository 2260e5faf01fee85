//! Audit repository trait

use async_trait::async_trait;

use super::entity::AuditEntry;
use crate::domain::DomainError;

/// Append-only repository for audit entries
#[async_trait]
pub trait AuditRepository: Send + Sync + std::fmt::Debug {
    /// Append an entry
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError>;

    /// All entries recorded for one entity, oldest first
    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, DomainError>;
}
