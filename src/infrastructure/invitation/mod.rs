//! Invitation infrastructure module

mod service;
mod token;

pub use service::{
    AcceptedInvitation, InvalidTokenReason, InvitationService, InvitationSummary,
    TokenValidation, DEFAULT_INVITATION_TTL_DAYS,
};
pub use token::generate_token;
