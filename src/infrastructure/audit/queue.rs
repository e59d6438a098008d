//! Audit Queue
//!
//! Buffers audit entries and flushes them to the sink in batches. A failed
//! flush keeps the entries queued so they are delivered by a later flush.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::EngineError;
use crate::domain::audit::{AuditEntry, AuditSink};
use crate::infrastructure::observability;

pub const DEFAULT_BATCH_SIZE: usize = 5;

pub struct AuditQueue {
    sink: Arc<dyn AuditSink>,
    batch_size: usize,
    pending: Mutex<Vec<AuditEntry>>,
}

impl std::fmt::Debug for AuditQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditQueue")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl AuditQueue {
    pub fn new(sink: Arc<dyn AuditSink>, batch_size: usize) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Queues an entry, flushing once the batch is full
    ///
    /// Flush errors are logged and swallowed.
    pub async fn append(&self, entry: AuditEntry) {
        let mut pending = self.pending.lock().await;
        pending.push(entry);

        if pending.len() >= self.batch_size {
            if let Err(e) = self.flush_locked(&mut pending).await {
                warn!(error = %e, pending = pending.len(), "Audit flush failed, entries retained");
            }
        }
    }

    /// Flushes everything queued; entries stay queued on error
    pub async fn flush(&self) -> Result<usize, EngineError> {
        let mut pending = self.pending.lock().await;
        self.flush_locked(&mut pending).await
    }

    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }

    async fn flush_locked(&self, pending: &mut Vec<AuditEntry>) -> Result<usize, EngineError> {
        if pending.is_empty() {
            return Ok(0);
        }

        let count = pending.len();
        match self.sink.persist_audit_batch(pending.as_slice()).await {
            Ok(()) => {
                pending.clear();
                observability::record_audit_flush(count, true);
                debug!(entries = count, "Audit batch flushed");
                Ok(count)
            }
            Err(e) => {
                observability::record_audit_flush(count, false);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::audit::{AuditOperation, AuditOutcome, MockAuditSink};

    fn entry() -> AuditEntry {
        AuditEntry::new(AuditOperation::SendMessage, "gemini", AuditOutcome::Success, Utc::now())
    }

    #[tokio::test]
    async fn test_flushes_at_batch_threshold() {
        let mut sink = MockAuditSink::new();
        sink.expect_persist_audit_batch()
            .withf(|entries: &[AuditEntry]| entries.len() == 5)
            .times(1)
            .returning(|_| Ok(()));
        let queue = AuditQueue::new(Arc::new(sink), DEFAULT_BATCH_SIZE);

        for _ in 0..4 {
            queue.append(entry()).await;
        }
        assert_eq!(queue.pending().await, 4);

        queue.append(entry()).await;
        assert_eq!(queue.pending().await, 0);
    }

    #[tokio::test]
    async fn test_failed_flush_retains_entries() {
        let mut sink = MockAuditSink::new();
        let mut seq = mockall::Sequence::new();
        sink.expect_persist_audit_batch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(EngineError::audit("sink offline")));
        sink.expect_persist_audit_batch()
            .withf(|entries: &[AuditEntry]| entries.len() == 6)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let queue = AuditQueue::new(Arc::new(sink), DEFAULT_BATCH_SIZE);

        for _ in 0..5 {
            queue.append(entry()).await;
        }
        assert_eq!(queue.pending().await, 5);

        queue.append(entry()).await;
        assert_eq!(queue.pending().await, 0);
    }

    #[tokio::test]
    async fn test_explicit_flush() {
        let mut sink = MockAuditSink::new();
        sink.expect_persist_audit_batch()
            .times(1)
            .returning(|_| Ok(()));
        let queue = AuditQueue::new(Arc::new(sink), DEFAULT_BATCH_SIZE);

        queue.append(entry()).await;
        queue.append(entry()).await;

        assert_eq!(queue.flush().await.unwrap(), 2);
        assert_eq!(queue.flush().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_explicit_flush_reports_error() {
        let mut sink = MockAuditSink::new();
        sink.expect_persist_audit_batch()
            .returning(|_| Err(EngineError::audit("sink offline")));
        let queue = AuditQueue::new(Arc::new(sink), DEFAULT_BATCH_SIZE);
        queue.append(entry()).await;

        assert!(queue.flush().await.is_err());
        assert_eq!(queue.pending().await, 1);
    }
}
