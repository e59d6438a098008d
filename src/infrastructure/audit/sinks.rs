//! Audit sink implementations

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::EngineError;
use crate::domain::audit::{AuditEntry, AuditSink};

/// Keeps flushed entries in memory
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
    batches: Mutex<usize>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn batch_count(&self) -> usize {
        *self.batches.lock().await
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn persist_audit_batch(&self, entries: &[AuditEntry]) -> Result<(), EngineError> {
        self.entries.lock().await.extend_from_slice(entries);
        *self.batches.lock().await += 1;
        Ok(())
    }
}

/// Writes each entry as a structured log event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn persist_audit_batch(&self, entries: &[AuditEntry]) -> Result<(), EngineError> {
        for entry in entries {
            info!(
                target: "audit",
                audit_id = %entry.audit_id,
                operation = %entry.operation,
                resource = %entry.resource,
                outcome = %entry.outcome,
                risk_level = ?entry.risk_level,
                session_id = entry.session_id.as_deref().unwrap_or(""),
                "audit"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::audit::{AuditOperation, AuditOutcome};

    #[tokio::test]
    async fn test_in_memory_sink_collects_batches() {
        let sink = InMemoryAuditSink::new();
        let entry = AuditEntry::new(AuditOperation::LedgerReset, "ledger", AuditOutcome::Success, Utc::now());

        sink.persist_audit_batch(&[entry.clone(), entry.clone()]).await.unwrap();
        sink.persist_audit_batch(&[entry]).await.unwrap();

        assert_eq!(sink.entries().await.len(), 3);
        assert_eq!(sink.batch_count().await, 2);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_batches() {
        let entry = AuditEntry::new(AuditOperation::CacheCleared, "cache", AuditOutcome::Success, Utc::now());

        assert!(TracingAuditSink.persist_audit_batch(&[entry]).await.is_ok());
    }
}
