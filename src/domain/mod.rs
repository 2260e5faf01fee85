//! Domain layer - entities, validation, repositories and the authorization
//! decision function

pub mod account;
pub mod audit;
pub mod authz;
pub mod error;
pub mod invitation;
pub mod membership;
pub mod store;
pub mod team;

pub use account::{Account, AccountId, AccountRepository, PlatformRole};
pub use audit::{AuditAction, AuditEntry, AuditRepository};
pub use authz::{Action, Decision, Principal, ResourceScope, TeamGrant};
pub use error::DomainError;
pub use invitation::{Invitation, InvitationId, InvitationRepository};
pub use membership::{Membership, MembershipId, MembershipRepository, TeamRole};
pub use store::{StoreTx, TransactionalStore};
pub use team::{Team, TeamId, TeamRepository};
