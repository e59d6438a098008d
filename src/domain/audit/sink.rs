//! Audit persistence boundary

use async_trait::async_trait;

use super::AuditEntry;
use crate::domain::EngineError;

#[cfg(test)]
use mockall::automock;

/// Destination for flushed audit batches
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persists a batch; the whole batch is retried on error
    async fn persist_audit_batch(&self, entries: &[AuditEntry]) -> Result<(), EngineError>;
}
