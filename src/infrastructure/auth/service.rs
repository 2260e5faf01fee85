//! Authentication service and account lifecycle operations

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::account::{Account, AccountId, AccountRepository, PlatformRole};
use crate::domain::audit::AuditAction;
use crate::domain::authz;
use crate::domain::membership::MembershipRepository;
use crate::domain::{DomainError, Principal};
use crate::infrastructure::audit::AuditRecorder;

use super::jwt::TokenIssuer;
use super::password::PasswordHasher;

/// Signed bearer credentials returned to the caller
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication: login and credential refresh
///
/// Missing account, soft-deleted account and wrong password are deliberately
/// indistinguishable to the caller.
#[derive(Debug)]
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: Arc<dyn TokenIssuer>,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        hasher: Arc<dyn PasswordHasher>,
        issuer: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            accounts,
            hasher,
            issuer,
        }
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<Credentials, DomainError> {
        let account = match self.accounts.get_by_email(email).await? {
            Some(account) => account,
            None => return Err(DomainError::auth("Invalid credentials")),
        };

        if !self.hasher.verify(password, account.password_hash()) {
            return Err(DomainError::auth("Invalid credentials"));
        }

        info!(account_id = %account.id(), "Account logged in");

        self.issue(&account)
    }

    /// Exchange a still-valid credential for a fresh one
    pub async fn refresh(&self, token: &str) -> Result<Credentials, DomainError> {
        let claims = self.issuer.verify(token)?;

        let account_id = claims
            .sub
            .parse::<Uuid>()
            .map(AccountId::from)
            .map_err(|_| DomainError::auth("Invalid credential subject"))?;

        // Re-load so a deactivated account cannot keep refreshing
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or_else(|| DomainError::auth("Invalid credentials"))?;

        self.issue(&account)
    }

    fn issue(&self, account: &Account) -> Result<Credentials, DomainError> {
        let token = self.issuer.sign(account)?;
        let expires_at = Utc::now() + Duration::hours(self.issuer.ttl_hours() as i64);

        Ok(Credentials { token, expires_at })
    }
}

/// Account lifecycle beyond signup: platform role changes and deactivation
#[derive(Debug)]
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    memberships: Arc<dyn MembershipRepository>,
    audit: AuditRecorder,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        memberships: Arc<dyn MembershipRepository>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            accounts,
            memberships,
            audit,
        }
    }

    /// Get an active account
    pub async fn get(&self, id: AccountId) -> Result<Option<Account>, DomainError> {
        self.accounts.get(id).await
    }

    /// Change an account's platform role. Only platform admins may do this.
    pub async fn change_platform_role(
        &self,
        actor: &Account,
        target_id: AccountId,
        new_role: PlatformRole,
    ) -> Result<Account, DomainError> {
        let principal = self.principal_for(actor).await?;

        if !authz::can_grant_platform_admin(&principal) {
            return Err(DomainError::forbidden(
                "Only platform admins may change platform roles",
            ));
        }

        let mut target = self
            .accounts
            .get(target_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account not found"))?;

        let old_role = target.platform_role();

        if old_role == new_role {
            return Ok(target);
        }

        info!(
            actor_id = %actor.id(),
            target_id = %target_id,
            old_role = %old_role,
            new_role = %new_role,
            "Changing platform role"
        );

        target.set_platform_role(new_role);
        let target = self.accounts.update(&target).await?;

        self.audit
            .platform_role_changed(Some(actor.id()), target_id, old_role, new_role)
            .await;

        Ok(target)
    }

    /// Soft-delete an account. Admins may deactivate anyone; everyone may
    /// deactivate themselves.
    pub async fn deactivate(
        &self,
        actor: &Account,
        target_id: AccountId,
    ) -> Result<(), DomainError> {
        if actor.id() != target_id && !actor.is_platform_admin() {
            return Err(DomainError::forbidden(
                "Only platform admins may deactivate other accounts",
            ));
        }

        let mut target = self
            .accounts
            .get(target_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account not found"))?;

        warn!(actor_id = %actor.id(), target_id = %target_id, "Deactivating account");

        target.soft_delete();
        self.accounts.update(&target).await?;

        self.audit
            .deleted(
                AuditAction::AccountDeactivated,
                Some(actor.id()),
                "account",
                &target_id.to_string(),
                serde_json::json!({ "email": target.email() }),
            )
            .await;

        Ok(())
    }

    /// Build the authorization principal for an account
    async fn principal_for(&self, account: &Account) -> Result<Principal, DomainError> {
        if !account.is_active() {
            return Err(DomainError::auth("Account is not active"));
        }

        let memberships = self.memberships.list_for_account(account.id()).await?;
        Ok(Principal::from_account(account, &memberships))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::auth::jwt::{JwtConfig, JwtService};
    use crate::infrastructure::auth::password::Argon2Hasher;
    use crate::infrastructure::memory::InMemoryStore;

    fn auth_service(store: Arc<InMemoryStore>) -> AuthService {
        AuthService::new(
            store,
            Arc::new(Argon2Hasher::new()),
            Arc::new(JwtService::new(JwtConfig::new("test-secret", 24))),
        )
    }

    fn account_service(store: Arc<InMemoryStore>) -> AccountService {
        AccountService::new(store.clone(), store.clone(), AuditRecorder::new(store))
    }

    async fn seed_account(store: &InMemoryStore, email: &str, password: &str) -> Account {
        let hash = Argon2Hasher::new().hash(password).unwrap();
        let account = Account::new(AccountId::new(), email, hash, "Test");
        AccountRepository::create(store, account).await.unwrap()
    }

    #[tokio::test]
    async fn test_login_success() {
        let store = Arc::new(InMemoryStore::new());
        let account = seed_account(&store, "a@example.com", "password123").await;
        let service = auth_service(store);

        let credentials = service.login("a@example.com", "password123").await.unwrap();
        assert!(!credentials.token.is_empty());
        assert!(credentials.expires_at > Utc::now());

        let _ = account;
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let store = Arc::new(InMemoryStore::new());
        seed_account(&store, "a@example.com", "password123").await;
        let service = auth_service(store);

        let result = service.login("a@example.com", "wrong_password").await;
        assert!(result.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let store = Arc::new(InMemoryStore::new());
        let service = auth_service(store);

        let result = service.login("nobody@example.com", "password123").await;
        assert!(result.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn test_login_soft_deleted_account() {
        let store = Arc::new(InMemoryStore::new());
        let mut account = seed_account(&store, "a@example.com", "password123").await;
        account.soft_delete();
        AccountRepository::update(store.as_ref(), &account)
            .await
            .unwrap();

        let service = auth_service(store);
        let result = service.login("a@example.com", "password123").await;
        assert!(result.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn test_refresh() {
        let store = Arc::new(InMemoryStore::new());
        seed_account(&store, "a@example.com", "password123").await;
        let service = auth_service(store);

        let credentials = service.login("a@example.com", "password123").await.unwrap();
        let refreshed = service.refresh(&credentials.token).await.unwrap();
        assert!(!refreshed.token.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_after_deactivation() {
        let store = Arc::new(InMemoryStore::new());
        let mut account = seed_account(&store, "a@example.com", "password123").await;
        let service = auth_service(store.clone());

        let credentials = service.login("a@example.com", "password123").await.unwrap();

        account.soft_delete();
        AccountRepository::update(store.as_ref(), &account)
            .await
            .unwrap();

        let result = service.refresh(&credentials.token).await;
        assert!(result.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn test_change_platform_role_requires_admin() {
        let store = Arc::new(InMemoryStore::new());
        let actor = seed_account(&store, "user@example.com", "password123").await;
        let target = seed_account(&store, "target@example.com", "password123").await;
        let service = account_service(store);

        let result = service
            .change_platform_role(&actor, target.id(), PlatformRole::Admin)
            .await;
        assert!(result.unwrap_err().is_forbidden());
    }

    #[tokio::test]
    async fn test_change_platform_role_as_admin() {
        let store = Arc::new(InMemoryStore::new());
        let mut actor = seed_account(&store, "admin@example.com", "password123").await;
        actor.set_platform_role(PlatformRole::Admin);
        AccountRepository::update(store.as_ref(), &actor)
            .await
            .unwrap();
        let target = seed_account(&store, "target@example.com", "password123").await;
        let service = account_service(store);

        let updated = service
            .change_platform_role(&actor, target.id(), PlatformRole::Admin)
            .await
            .unwrap();
        assert!(updated.is_platform_admin());
    }

    #[tokio::test]
    async fn test_deactivate_self() {
        let store = Arc::new(InMemoryStore::new());
        let account = seed_account(&store, "a@example.com", "password123").await;
        let service = account_service(store.clone());

        service.deactivate(&account, account.id()).await.unwrap();
        assert!(store.get_by_email("a@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivate_other_requires_admin() {
        let store = Arc::new(InMemoryStore::new());
        let actor = seed_account(&store, "user@example.com", "password123").await;
        let target = seed_account(&store, "target@example.com", "password123").await;
        let service = account_service(store);

        let result = service.deactivate(&actor, target.id()).await;
        assert!(result.unwrap_err().is_forbidden());
    }
}
