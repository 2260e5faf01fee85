//! Infrastructure layer - service implementations, stores and adapters

pub mod audit;
pub mod auth;
pub mod invitation;
pub mod logging;
pub mod membership;
pub mod memory;
pub mod postgres;
pub mod signup;

pub use audit::AuditRecorder;
pub use auth::{
    AccountService, Argon2Hasher, AuthService, Claims, Credentials, JwtConfig, JwtService,
    PasswordHasher, TokenIssuer,
};
pub use invitation::{
    AcceptedInvitation, InvalidTokenReason, InvitationService, InvitationSummary,
    TokenValidation,
};
pub use logging::init_logging;
pub use membership::MembershipService;
pub use memory::InMemoryStore;
pub use postgres::{run_migrations, PgStore};
pub use signup::{SignupOutcome, SignupRequest, SignupService};
