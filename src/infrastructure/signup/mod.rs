//! Signup infrastructure module

mod service;

pub use service::{SignupOutcome, SignupRequest, SignupService};
