//! Audit domain module

mod entity;
mod repository;

pub use entity::{AuditAction, AuditEntry};
pub use repository::AuditRepository;
