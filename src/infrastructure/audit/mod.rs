//! Audit queue and sinks

mod queue;
mod sinks;

pub use queue::{AuditQueue, DEFAULT_BATCH_SIZE};
pub use sinks::{InMemoryAuditSink, TracingAuditSink};
