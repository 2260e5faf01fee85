//! Invitation domain module

mod entity;
mod repository;

pub use entity::{Invitation, InvitationId};
pub use repository::InvitationRepository;
