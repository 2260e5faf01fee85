//! Membership domain module
//!
//! Memberships are the single source of truth for team-scoped authorization;
//! there is no separate "team admin" pointer anywhere.

mod entity;
mod repository;

pub use entity::{Membership, MembershipId, TeamRole};
pub use repository::MembershipRepository;
