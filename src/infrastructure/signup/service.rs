//! Self-service signup
//!
//! The first active account on the platform becomes a platform admin. That
//! decision is made under an exclusive accounts-table lock inside the signup
//! transaction, so concurrent first signups cannot both win.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::domain::account::{
    email_local_part, validate_display_name, validate_email, validate_password, Account,
    AccountId, PlatformRole,
};
use crate::domain::audit::AuditAction;
use crate::domain::membership::{Membership, TeamRole};
use crate::domain::store::{StoreTx, TransactionalStore};
use crate::domain::team::{sanitize_slug, Team, TeamId};
use crate::domain::DomainError;
use crate::infrastructure::audit::AuditRecorder;
use crate::infrastructure::auth::PasswordHasher;

/// Everything needed to open an account
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    /// Join this existing team as a member instead of getting a personal team
    pub team_id: Option<TeamId>,
    /// Explicit platform role. When absent the first account becomes an
    /// admin, every later one a regular user.
    pub platform_role: Option<PlatformRole>,
}

impl SignupRequest {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            display_name: display_name.into(),
            team_id: None,
            platform_role: None,
        }
    }

    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn with_platform_role(mut self, role: PlatformRole) -> Self {
        self.platform_role = Some(role);
        self
    }
}

/// The rows created by a successful signup
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub account: Account,
    pub team: Team,
    pub membership: Membership,
}

/// Signup service
#[derive(Debug)]
pub struct SignupService {
    store: Arc<dyn TransactionalStore>,
    hasher: Arc<dyn PasswordHasher>,
    audit: AuditRecorder,
}

impl SignupService {
    pub fn new(
        store: Arc<dyn TransactionalStore>,
        hasher: Arc<dyn PasswordHasher>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            store,
            hasher,
            audit,
        }
    }

    /// Open a new account
    ///
    /// Creates the account, its team attachment (a fresh personal team with
    /// an owner membership, or a member membership in the requested existing
    /// team) and nothing else, atomically. On any failure no partial rows
    /// remain.
    pub async fn signup(&self, request: SignupRequest) -> Result<SignupOutcome, DomainError> {
        validate_email(&request.email).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_password(&request.password)
            .map_err(|e| DomainError::validation(e.to_string()))?;
        validate_display_name(&request.display_name)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        // Hash outside the transaction, it is by far the slowest step
        let password_hash = self.hasher.hash(&request.password)?;

        let mut tx = self.store.begin().await?;

        let outcome = Self::signup_in_tx(tx.as_mut(), &request, password_hash).await;

        let (outcome, created_team) = match outcome {
            Ok(result) => {
                tx.commit().await?;
                result
            }
            Err(e) => {
                warn!(email = %request.email, error = %e, "Signup failed");
                tx.rollback().await?;
                return Err(e);
            }
        };

        info!(
            account_id = %outcome.account.id(),
            team_id = %outcome.team.id(),
            platform_role = %outcome.account.platform_role(),
            "Account created"
        );

        self.audit
            .record(
                AuditAction::AccountCreated,
                Some(outcome.account.id()),
                "account",
                &outcome.account.id().to_string(),
                json!({
                    "email": outcome.account.email(),
                    "platform_role": outcome.account.platform_role().to_string(),
                    "team_id": outcome.team.id().to_string(),
                }),
            )
            .await;

        if created_team {
            self.audit
                .record(
                    AuditAction::TeamCreated,
                    Some(outcome.account.id()),
                    "team",
                    &outcome.team.id().to_string(),
                    json!({ "slug": outcome.team.slug() }),
                )
                .await;
        }

        Ok(outcome)
    }

    async fn signup_in_tx(
        tx: &mut (dyn StoreTx + '_),
        request: &SignupRequest,
        password_hash: String,
    ) -> Result<(SignupOutcome, bool), DomainError> {
        if tx.find_account_by_email(&request.email).await?.is_some() {
            return Err(DomainError::conflict(format!(
                "Account with email '{}' already exists",
                request.email
            )));
        }

        // The table lock serializes the first-account decision
        tx.lock_accounts().await?;
        let active_accounts = tx.count_active_accounts().await?;

        let platform_role = match request.platform_role {
            Some(role) => role,
            None if active_accounts == 0 => PlatformRole::Admin,
            None => PlatformRole::User,
        };

        let mut account = Account::new(
            AccountId::new(),
            request.email.clone(),
            password_hash,
            request.display_name.clone(),
        );
        if platform_role != account.platform_role() {
            account.set_platform_role(platform_role);
        }

        let (team, team_role, created_team) = match request.team_id {
            Some(team_id) => {
                let team = tx
                    .find_team(team_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Team not found"))?;
                (team, TeamRole::Member, false)
            }
            None => {
                let team = Self::personal_team(&request.email, &request.display_name)?;
                tx.insert_team(&team).await?;
                (team, TeamRole::Owner, true)
            }
        };

        account.set_primary_team(Some(team.id()));
        tx.insert_account(&account).await?;

        let membership = Membership::new(account.id(), team.id(), team_role);
        tx.insert_membership(&membership).await?;

        Ok((
            SignupOutcome {
                account,
                team,
                membership,
            },
            created_team,
        ))
    }

    /// Build the personal team for a fresh signup
    ///
    /// The slug combines the sanitized email local part with a timestamp
    /// suffix, so two signups from similar addresses never collide.
    fn personal_team(email: &str, display_name: &str) -> Result<Team, DomainError> {
        let base = sanitize_slug(email_local_part(email));
        let base: String = base.chars().take(38).collect();
        let base = base.trim_end_matches('-');
        let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u128;

        let slug = format!("{}-{:x}", base, suffix);
        let name = format!("{}'s Team", display_name);

        Team::new(TeamId::new(), slug, name)
            .map_err(|e| DomainError::validation(e.to_string()))
    }
}
