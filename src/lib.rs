//! Platform core - multi-tenant membership, authorization and invitations
//!
//! This crate is the business core behind a team/project platform: account
//! signup with first-account-becomes-admin bootstrap, team membership with
//! two independent privilege dimensions (platform role and team role), a
//! pure authorization decision function, single-use invitation tokens and a
//! best-effort audit log. Transport layers (HTTP, CLI) live elsewhere and
//! call into [`PlatformServices`].

pub mod config;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::domain::account::AccountRepository;
use crate::domain::audit::AuditRepository;
use crate::domain::invitation::InvitationRepository;
use crate::domain::membership::MembershipRepository;
use crate::domain::store::TransactionalStore;
use crate::domain::team::TeamRepository;
use crate::infrastructure::{
    AccountService, Argon2Hasher, AuditRecorder, AuthService, InMemoryStore, InvitationService,
    JwtConfig, JwtService, MembershipService, PgStore, SignupService,
};

/// The assembled service layer
///
/// One instance per process; every service shares the same store and audit
/// recorder.
#[derive(Debug)]
pub struct PlatformServices {
    pub signup: SignupService,
    pub auth: AuthService,
    pub accounts: AccountService,
    pub memberships: MembershipService,
    pub invitations: InvitationService,
}

impl PlatformServices {
    /// Wire all services against an in-memory store
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::assemble(Arc::new(InMemoryStore::new()), config)
    }

    /// Wire all services against PostgreSQL
    pub fn postgres(pool: PgPool, config: &AppConfig) -> Self {
        Self::assemble(Arc::new(PgStore::new(pool)), config)
    }

    fn assemble<S>(store: Arc<S>, config: &AppConfig) -> Self
    where
        S: AccountRepository
            + TeamRepository
            + MembershipRepository
            + InvitationRepository
            + AuditRepository
            + TransactionalStore
            + 'static,
    {
        let hasher = Arc::new(Argon2Hasher::new());
        let issuer = Arc::new(JwtService::new(JwtConfig::new(
            config.auth.jwt_secret.clone(),
            config.auth.token_ttl_hours,
        )));
        let audit = AuditRecorder::new(store.clone());

        Self {
            signup: SignupService::new(store.clone(), hasher.clone(), audit.clone()),
            auth: AuthService::new(store.clone(), hasher.clone(), issuer.clone()),
            accounts: AccountService::new(store.clone(), store.clone(), audit.clone()),
            memberships: MembershipService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                audit.clone(),
            ),
            invitations: InvitationService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                hasher,
                issuer,
                audit,
                Duration::days(config.auth.invitation_ttl_days),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::membership::TeamRole;
    use crate::infrastructure::SignupRequest;

    #[tokio::test]
    async fn test_in_memory_wiring_end_to_end() {
        let services = PlatformServices::in_memory(&AppConfig::default());

        let outcome = services
            .signup
            .signup(SignupRequest::new(
                "founder@example.com",
                "password123",
                "Founder",
            ))
            .await
            .unwrap();
        assert!(outcome.account.is_platform_admin());

        let credentials = services
            .auth
            .login("founder@example.com", "password123")
            .await
            .unwrap();
        assert!(!credentials.token.is_empty());

        let invitation = services
            .invitations
            .invite(
                &outcome.account,
                "colleague@example.com",
                outcome.team.id(),
                Some(TeamRole::Member),
                None,
            )
            .await
            .unwrap();

        let accepted = services
            .invitations
            .accept(invitation.token(), "password123", "Colleague")
            .await
            .unwrap();
        assert_eq!(accepted.membership.team_id(), outcome.team.id());

        let members = services
            .memberships
            .list_members(&outcome.account, outcome.team.id())
            .await
            .unwrap();
        assert_eq!(members.len(), 2);
    }
}
