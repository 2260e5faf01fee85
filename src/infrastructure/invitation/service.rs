//! Invitation issuance, validation and acceptance

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::account::{
    validate_display_name, validate_email, validate_password, Account, AccountId,
    AccountRepository,
};
use crate::domain::audit::AuditAction;
use crate::domain::authz::{self, Action, Principal, ResourceScope};
use crate::domain::invitation::{Invitation, InvitationId, InvitationRepository};
use crate::domain::membership::{Membership, MembershipRepository, TeamRole};
use crate::domain::store::TransactionalStore;
use crate::domain::team::{TeamId, TeamRepository};
use crate::domain::DomainError;
use crate::infrastructure::audit::AuditRecorder;
use crate::infrastructure::auth::{Credentials, PasswordHasher, TokenIssuer};

use super::token::generate_token;

/// Default invitation lifetime
pub const DEFAULT_INVITATION_TTL_DAYS: i64 = 7;

/// Why a token failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidTokenReason {
    NotFound,
    Expired,
    AlreadyUsed,
}

impl std::fmt::Display for InvalidTokenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Expired => write!(f, "expired"),
            Self::AlreadyUsed => write!(f, "already_used"),
        }
    }
}

/// Outcome of a read-only token check
///
/// Deliberately says nothing about whether an account exists for the
/// invited email.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "valid")]
pub enum TokenValidation {
    #[serde(rename = "true")]
    Valid {
        email: String,
        team_name: String,
        expires_at: DateTime<Utc>,
    },
    #[serde(rename = "false")]
    Invalid { reason: InvalidTokenReason },
}

/// An invitation as shown in listings - no token
#[derive(Debug, Clone, Serialize)]
pub struct InvitationSummary {
    pub id: InvitationId,
    pub email: String,
    pub team_id: TeamId,
    pub role: TeamRole,
    pub invited_by: AccountId,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Invitation> for InvitationSummary {
    fn from(invitation: &Invitation) -> Self {
        Self {
            id: invitation.id(),
            email: invitation.email().to_string(),
            team_id: invitation.team_id(),
            role: invitation.role(),
            invited_by: invitation.invited_by(),
            expires_at: invitation.expires_at(),
            used_at: invitation.used_at(),
            created_at: invitation.created_at(),
        }
    }
}

/// The rows created by accepting an invitation
#[derive(Debug, Clone)]
pub struct AcceptedInvitation {
    pub account: Account,
    pub membership: Membership,
    pub credentials: Credentials,
}

/// Invitation service
#[derive(Debug)]
pub struct InvitationService {
    invitations: Arc<dyn InvitationRepository>,
    accounts: Arc<dyn AccountRepository>,
    teams: Arc<dyn TeamRepository>,
    memberships: Arc<dyn MembershipRepository>,
    store: Arc<dyn TransactionalStore>,
    hasher: Arc<dyn PasswordHasher>,
    issuer: Arc<dyn TokenIssuer>,
    audit: AuditRecorder,
    ttl: Duration,
}

impl InvitationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invitations: Arc<dyn InvitationRepository>,
        accounts: Arc<dyn AccountRepository>,
        teams: Arc<dyn TeamRepository>,
        memberships: Arc<dyn MembershipRepository>,
        store: Arc<dyn TransactionalStore>,
        hasher: Arc<dyn PasswordHasher>,
        issuer: Arc<dyn TokenIssuer>,
        audit: AuditRecorder,
        ttl: Duration,
    ) -> Self {
        Self {
            invitations,
            accounts,
            teams,
            memberships,
            store,
            hasher,
            issuer,
            audit,
            ttl,
        }
    }

    /// Invite an email address into a team
    ///
    /// The returned invitation still carries its token; the caller is
    /// responsible for delivering it to the invitee. It never appears in
    /// listings or serialized output.
    pub async fn invite(
        &self,
        inviter: &Account,
        email: &str,
        team_id: TeamId,
        role: Option<TeamRole>,
        message: Option<String>,
    ) -> Result<Invitation, DomainError> {
        validate_email(email).map_err(|e| DomainError::validation(e.to_string()))?;

        let principal = self.principal_for(inviter).await?;
        authz::decide(&principal, Action::Create, &ResourceScope::team(team_id))
            .require("Team")?;

        let team = self
            .teams
            .get(team_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Team not found"))?;

        if self.accounts.get_by_email(email).await?.is_some() {
            return Err(DomainError::conflict(
                "An account with this email already exists",
            ));
        }

        if self.invitations.find_active(email, team_id).await?.is_some() {
            return Err(DomainError::conflict(
                "An active invitation for this email already exists",
            ));
        }

        let invitation = Invitation::new(
            email,
            generate_token(),
            team_id,
            role.unwrap_or_default(),
            inviter.id(),
            message,
            self.ttl,
        );
        let invitation = self.invitations.create(invitation).await?;

        info!(
            invitation_id = %invitation.id(),
            team_id = %team_id,
            inviter = %inviter.id(),
            "Invitation created"
        );

        self.audit
            .record(
                AuditAction::InvitationCreated,
                Some(inviter.id()),
                "invitation",
                &invitation.id().to_string(),
                json!({
                    "email": invitation.email(),
                    "team_slug": team.slug(),
                    "role": invitation.role().to_string(),
                }),
            )
            .await;

        Ok(invitation)
    }

    /// Check a token without consuming it
    pub async fn validate(&self, token: &str) -> Result<TokenValidation, DomainError> {
        let invitation = match self.invitations.get_by_token(token).await? {
            Some(invitation) => invitation,
            None => {
                return Ok(TokenValidation::Invalid {
                    reason: InvalidTokenReason::NotFound,
                })
            }
        };

        if invitation.is_used() {
            return Ok(TokenValidation::Invalid {
                reason: InvalidTokenReason::AlreadyUsed,
            });
        }

        if invitation.is_expired() {
            return Ok(TokenValidation::Invalid {
                reason: InvalidTokenReason::Expired,
            });
        }

        // A deleted team invalidates its outstanding invitations
        let team = match self.teams.get(invitation.team_id()).await? {
            Some(team) => team,
            None => {
                return Ok(TokenValidation::Invalid {
                    reason: InvalidTokenReason::NotFound,
                })
            }
        };

        Ok(TokenValidation::Valid {
            email: invitation.email().to_string(),
            team_name: team.name().to_string(),
            expires_at: invitation.expires_at(),
        })
    }

    /// Accept an invitation, creating the account and membership atomically
    ///
    /// The token is re-validated and the email re-checked inside the
    /// transaction; marking the invitation used commits together with the
    /// new rows, so a token can never be consumed twice.
    pub async fn accept(
        &self,
        token: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AcceptedInvitation, DomainError> {
        validate_password(password).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_display_name(display_name)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let password_hash = self.hasher.hash(password)?;

        let mut tx = self.store.begin().await?;

        let outcome = async {
            let invitation = tx
                .find_invitation_by_token(token)
                .await?
                .ok_or_else(|| DomainError::not_found("Invitation not found"))?;

            if invitation.is_used() {
                return Err(DomainError::conflict("Invitation has already been used"));
            }
            if invitation.is_expired() {
                return Err(DomainError::validation("Invitation has expired"));
            }

            if tx
                .find_account_by_email(invitation.email())
                .await?
                .is_some()
            {
                return Err(DomainError::conflict(
                    "An account with this email already exists",
                ));
            }

            let team = tx
                .find_team(invitation.team_id())
                .await?
                .ok_or_else(|| DomainError::not_found("Team not found"))?;

            let mut account = Account::new(
                AccountId::new(),
                invitation.email().to_string(),
                password_hash,
                display_name.to_string(),
            );
            account.set_primary_team(Some(team.id()));
            tx.insert_account(&account).await?;

            let membership = Membership::new(account.id(), team.id(), invitation.role());
            tx.insert_membership(&membership).await?;

            tx.mark_invitation_used(invitation.id(), Utc::now()).await?;

            Ok((invitation, account, membership))
        }
        .await;

        let (invitation, account, membership) = match outcome {
            Ok(result) => {
                tx.commit().await?;
                result
            }
            Err(e) => {
                warn!(error = %e, "Invitation acceptance failed");
                tx.rollback().await?;
                return Err(e);
            }
        };

        info!(
            invitation_id = %invitation.id(),
            account_id = %account.id(),
            team_id = %membership.team_id(),
            "Invitation accepted"
        );

        self.audit
            .record(
                AuditAction::InvitationAccepted,
                Some(account.id()),
                "invitation",
                &invitation.id().to_string(),
                json!({
                    "account_id": account.id().to_string(),
                    "team_id": membership.team_id().to_string(),
                    "role": membership.role().to_string(),
                }),
            )
            .await;

        let credentials = self.issue(&account)?;

        Ok(AcceptedInvitation {
            account,
            membership,
            credentials,
        })
    }

    /// List a team's invitations, without tokens
    pub async fn list_for_team(
        &self,
        requester: &Account,
        team_id: TeamId,
    ) -> Result<Vec<InvitationSummary>, DomainError> {
        let principal = self.principal_for(requester).await?;
        authz::decide(&principal, Action::Create, &ResourceScope::team(team_id))
            .require("Team")?;

        let invitations = self.invitations.list_for_team(team_id).await?;
        Ok(invitations.iter().map(InvitationSummary::from).collect())
    }

    fn issue(&self, account: &Account) -> Result<Credentials, DomainError> {
        let token = self.issuer.sign(account)?;
        let expires_at = Utc::now() + Duration::hours(self.issuer.ttl_hours() as i64);

        Ok(Credentials { token, expires_at })
    }

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
    use crate::domain::account::PlatformRole;
    use crate::domain::team::Team;
    use crate::infrastructure::auth::{Argon2Hasher, JwtConfig, JwtService};
    use crate::infrastructure::memory::InMemoryStore;

    fn service(store: Arc<InMemoryStore>) -> InvitationService {
        InvitationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(Argon2Hasher::new()),
            Arc::new(JwtService::new(JwtConfig::new("test-secret", 24))),
            AuditRecorder::new(store),
            Duration::days(DEFAULT_INVITATION_TTL_DAYS),
        )
    }

    async fn seed_owner_and_team(store: &InMemoryStore) -> (Account, Team) {
        let owner = Account::new(AccountId::new(), "owner@example.com", "hash", "Owner");
        let owner = AccountRepository::create(store, owner).await.unwrap();

        let team = Team::new(TeamId::new(), "alpha", "Alpha").unwrap();
        let team = TeamRepository::create(store, team).await.unwrap();

        let membership = Membership::new(owner.id(), team.id(), TeamRole::Owner);
        MembershipRepository::create(store, membership)
            .await
            .unwrap();

        (owner, team)
    }

    #[tokio::test]
    async fn test_invite_and_validate() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (owner, team) = seed_owner_and_team(&store).await;

        let invitation = service
            .invite(&owner, "invitee@example.com", team.id(), None, None)
            .await
            .unwrap();
        assert_eq!(invitation.role(), TeamRole::Member);
        assert_eq!(invitation.token().len(), 43);

        match service.validate(invitation.token()).await.unwrap() {
            TokenValidation::Valid {
                email, team_name, ..
            } => {
                assert_eq!(email, "invitee@example.com");
                assert_eq!(team_name, "Alpha");
            }
            other => panic!("expected valid token, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invite_requires_owner() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (owner, team) = seed_owner_and_team(&store).await;

        let member = Account::new(AccountId::new(), "member@example.com", "hash", "Member");
        let member = AccountRepository::create(store.as_ref(), member)
            .await
            .unwrap();
        MembershipRepository::create(
            store.as_ref(),
            Membership::new(member.id(), team.id(), TeamRole::Member),
        )
        .await
        .unwrap();

        let result = service
            .invite(&member, "invitee@example.com", team.id(), None, None)
            .await;
        assert!(result.unwrap_err().is_forbidden());

        let _ = owner;
    }

    #[tokio::test]
    async fn test_invite_by_outsider_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (_, team) = seed_owner_and_team(&store).await;

        let outsider = Account::new(AccountId::new(), "outsider@example.com", "hash", "X");
        let outsider = AccountRepository::create(store.as_ref(), outsider)
            .await
            .unwrap();

        let result = service
            .invite(&outsider, "invitee@example.com", team.id(), None, None)
            .await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_invite_existing_account_conflicts() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (owner, team) = seed_owner_and_team(&store).await;

        let result = service
            .invite(&owner, "owner@example.com", team.id(), None, None)
            .await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_duplicate_active_invitation_conflicts() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (owner, team) = seed_owner_and_team(&store).await;

        service
            .invite(&owner, "invitee@example.com", team.id(), None, None)
            .await
            .unwrap();
        let result = service
            .invite(&owner, "invitee@example.com", team.id(), None, None)
            .await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_reinvite_after_expiry_succeeds() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (owner, team) = seed_owner_and_team(&store).await;

        let expired = Invitation::new(
            "invitee@example.com",
            "expired-token",
            team.id(),
            TeamRole::Member,
            owner.id(),
            None,
            Duration::seconds(-1),
        );
        InvitationRepository::create(store.as_ref(), expired)
            .await
            .unwrap();

        // An expired invitation no longer blocks a fresh one
        let invitation = service
            .invite(&owner, "invitee@example.com", team.id(), None, None)
            .await
            .unwrap();
        assert!(invitation.is_active());
    }

    #[tokio::test]
    async fn test_validate_unknown_token() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());

        match service.validate("no-such-token").await.unwrap() {
            TokenValidation::Invalid { reason } => {
                assert_eq!(reason, InvalidTokenReason::NotFound);
            }
            other => panic!("expected invalid token, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_expired_token() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (_, team) = seed_owner_and_team(&store).await;

        let invitation = Invitation::new(
            "invitee@example.com",
            "expired-token",
            team.id(),
            TeamRole::Member,
            AccountId::new(),
            None,
            Duration::seconds(-1),
        );
        InvitationRepository::create(store.as_ref(), invitation)
            .await
            .unwrap();

        match service.validate("expired-token").await.unwrap() {
            TokenValidation::Invalid { reason } => {
                assert_eq!(reason, InvalidTokenReason::Expired);
            }
            other => panic!("expected expired token, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_accept_creates_account_and_membership() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (owner, team) = seed_owner_and_team(&store).await;

        let invitation = service
            .invite(
                &owner,
                "invitee@example.com",
                team.id(),
                Some(TeamRole::Owner),
                Some("welcome".to_string()),
            )
            .await
            .unwrap();

        let accepted = service
            .accept(invitation.token(), "password123", "Invitee")
            .await
            .unwrap();

        assert_eq!(accepted.account.email(), "invitee@example.com");
        assert_eq!(accepted.account.platform_role(), PlatformRole::User);
        assert_eq!(accepted.account.primary_team_id(), Some(team.id()));
        assert_eq!(accepted.membership.role(), TeamRole::Owner);
        assert!(!accepted.credentials.token.is_empty());

        let stored = store.get_by_token(invitation.token()).await.unwrap().unwrap();
        assert!(stored.is_used());
    }

    #[tokio::test]
    async fn test_accept_twice_fails_atomically() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (owner, team) = seed_owner_and_team(&store).await;

        let invitation = service
            .invite(&owner, "invitee@example.com", team.id(), None, None)
            .await
            .unwrap();

        service
            .accept(invitation.token(), "password123", "Invitee")
            .await
            .unwrap();
        let result = service
            .accept(invitation.token(), "password123", "Invitee")
            .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(store.count_active().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_accept_expired_leaves_nothing_behind() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (_, team) = seed_owner_and_team(&store).await;

        let invitation = Invitation::new(
            "invitee@example.com",
            "expired-token",
            team.id(),
            TeamRole::Member,
            AccountId::new(),
            None,
            Duration::seconds(-1),
        );
        InvitationRepository::create(store.as_ref(), invitation)
            .await
            .unwrap();

        let result = service.accept("expired-token", "password123", "Invitee").await;
        assert!(result.unwrap_err().is_validation());
        assert!(store
            .get_by_email("invitee@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_accept_weak_password_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (owner, team) = seed_owner_and_team(&store).await;

        let invitation = service
            .invite(&owner, "invitee@example.com", team.id(), None, None)
            .await
            .unwrap();

        let result = service.accept(invitation.token(), "short", "Invitee").await;
        assert!(result.unwrap_err().is_validation());

        // Still acceptable afterwards
        service
            .accept(invitation.token(), "password123", "Invitee")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_for_team_has_no_tokens() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());
        let (owner, team) = seed_owner_and_team(&store).await;

        let invitation = service
            .invite(&owner, "invitee@example.com", team.id(), None, None)
            .await
            .unwrap();

        let summaries = service.list_for_team(&owner, team.id()).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].email, "invitee@example.com");

        let json = serde_json::to_string(&summaries).unwrap();
        assert!(!json.contains(invitation.token()));
    }
}
