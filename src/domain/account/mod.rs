//! Account domain module
//!
//! Accounts carry the platform-wide privilege dimension (User vs Admin).
//! Team-scoped privileges live on memberships, not here.

mod entity;
mod repository;
mod validation;

pub use entity::{Account, AccountId, PlatformRole};
pub use repository::AccountRepository;
pub use validation::{
    email_local_part, validate_display_name, validate_email, validate_password,
    AccountValidationError,
};
