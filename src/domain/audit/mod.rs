//! Audit domain - entries and the sink they are flushed to

mod entry;
mod sink;

pub use entry::{AuditEntry, AuditOperation, AuditOutcome, RiskLevel};
pub use sink::AuditSink;

#[cfg(test)]
pub use sink::MockAuditSink;
