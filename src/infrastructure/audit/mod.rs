//! Audit infrastructure module

mod recorder;

pub use recorder::AuditRecorder;

#[cfg(test)]
pub use recorder::test_support::FailingAuditRepository;
