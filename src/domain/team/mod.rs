//! Team domain module
//!
//! Teams are the tenant boundary: every team-scoped resource carries a team
//! ID, and cross-team access surfaces as NotFound.

mod entity;
mod repository;
mod validation;

pub use entity::{Team, TeamId};
pub use repository::TeamRepository;
pub use validation::{
    sanitize_slug, validate_team_name, validate_team_slug, TeamValidationError,
};
