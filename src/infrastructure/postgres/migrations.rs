//! Database migrations
//!
//! Embedded, versioned SQL applied through a `_migrations` bookkeeping
//! table. The partial unique indexes make "unique among active rows" hold
//! at the database level, so duplicate-key errors surface as conflicts even
//! under concurrent writers.

use sqlx::postgres::PgPool;

use crate::domain::DomainError;

/// One versioned schema change
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version, ascending
    pub version: i64,
    /// Human-readable description
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
    /// SQL to run when reverting the migration
    pub down: String,
}

impl Migration {
    pub fn new(
        version: i64,
        description: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
            down: down.into(),
        }
    }
}

/// Applies embedded migrations against PostgreSQL
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to check migration status: {}", e))
            })
    }

    /// Runs a single migration, skipping it when already applied
    pub async fn run_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        if self.is_applied(migration.version).await? {
            return Ok(());
        }

        sqlx::query(&migration.up)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        Ok(())
    }

    /// Reverts a single migration when it is applied
    pub async fn revert_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        if !self.is_applied(migration.version).await? {
            return Ok(());
        }

        sqlx::query(&migration.down)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to revert migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("DELETE FROM _migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to remove migration record {}: {}",
                    migration.version, e
                ))
            })?;

        Ok(())
    }

    /// Latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// The full schema, one migration per table
pub fn platform_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create accounts table",
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY,
                email VARCHAR(320) NOT NULL,
                password_hash TEXT NOT NULL,
                display_name VARCHAR(255) NOT NULL,
                platform_role VARCHAR(16) NOT NULL,
                primary_team_id UUID,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                deleted_at TIMESTAMPTZ
            );
            CREATE UNIQUE INDEX IF NOT EXISTS uq_accounts_email_active
                ON accounts(email) WHERE deleted_at IS NULL;
            "#,
            r#"
            DROP TABLE IF EXISTS accounts;
            "#,
        ),
        Migration::new(
            2,
            "Create teams table",
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id UUID PRIMARY KEY,
                slug VARCHAR(60) NOT NULL,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                deleted_at TIMESTAMPTZ
            );
            CREATE UNIQUE INDEX IF NOT EXISTS uq_teams_slug_active
                ON teams(slug) WHERE deleted_at IS NULL;
            "#,
            r#"
            DROP TABLE IF EXISTS teams;
            "#,
        ),
        Migration::new(
            3,
            "Create memberships table",
            r#"
            CREATE TABLE IF NOT EXISTS memberships (
                id UUID PRIMARY KEY,
                account_id UUID NOT NULL REFERENCES accounts(id),
                team_id UUID NOT NULL REFERENCES teams(id),
                role VARCHAR(16) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                UNIQUE (account_id, team_id)
            );
            CREATE INDEX IF NOT EXISTS idx_memberships_team_id ON memberships(team_id);
            "#,
            r#"
            DROP TABLE IF EXISTS memberships;
            "#,
        ),
        Migration::new(
            4,
            "Create invitations table",
            r#"
            CREATE TABLE IF NOT EXISTS invitations (
                id UUID PRIMARY KEY,
                email VARCHAR(320) NOT NULL,
                token VARCHAR(64) NOT NULL UNIQUE,
                team_id UUID NOT NULL REFERENCES teams(id),
                role VARCHAR(16) NOT NULL,
                invited_by UUID NOT NULL,
                message TEXT,
                expires_at TIMESTAMPTZ NOT NULL,
                used_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_invitations_email_team
                ON invitations(email, team_id);
            "#,
            r#"
            DROP TABLE IF EXISTS invitations;
            "#,
        ),
        Migration::new(
            5,
            "Create audit_log table",
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id UUID PRIMARY KEY,
                action VARCHAR(64) NOT NULL,
                actor_id UUID,
                entity_type VARCHAR(64) NOT NULL,
                entity_id VARCHAR(255) NOT NULL,
                metadata JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audit_log_entity
                ON audit_log(entity_type, entity_id);
            "#,
            r#"
            DROP TABLE IF EXISTS audit_log;
            "#,
        ),
    ]
}

/// Runs all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    let migrator = PostgresMigrator::new(pool.clone());

    for migration in platform_migrations() {
        migrator.run_migration(&migration).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_ordered_and_complete() {
        let migrations = platform_migrations();
        assert!(!migrations.is_empty());

        for i in 1..migrations.len() {
            assert!(migrations[i].version > migrations[i - 1].version);
        }

        for migration in &migrations {
            assert!(!migration.description.is_empty());
            assert!(!migration.up.is_empty());
            assert!(!migration.down.is_empty());
        }
    }

    fn migration_for(table: &str) -> Migration {
        platform_migrations()
            .into_iter()
            .find(|m| m.up.contains(table))
            .unwrap()
    }

    #[test]
    fn test_active_uniqueness_is_partial() {
        // Soft-deleted rows must not block reuse of an email or slug
        let accounts = migration_for("CREATE TABLE IF NOT EXISTS accounts");
        assert!(accounts
            .up
            .contains("ON accounts(email) WHERE deleted_at IS NULL"));

        let teams = migration_for("CREATE TABLE IF NOT EXISTS teams");
        assert!(teams.up.contains("ON teams(slug) WHERE deleted_at IS NULL"));
    }

    #[test]
    fn test_membership_pair_constrained() {
        let memberships = migration_for("CREATE TABLE IF NOT EXISTS memberships");
        assert!(memberships.up.contains("UNIQUE (account_id, team_id)"));
    }

    #[test]
    fn test_invitation_token_unique() {
        let invitations = migration_for("CREATE TABLE IF NOT EXISTS invitations");
        assert!(invitations.up.contains("token VARCHAR(64) NOT NULL UNIQUE"));
    }
}
