//! Conversation export boundary

use async_trait::async_trait;

use crate::domain::EngineError;

#[cfg(test)]
use mockall::automock;

/// Stores serialized conversations outside the engine
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConversationExporter: Send + Sync {
    /// Stores `serialized` and returns where it was stored
    async fn export_conversation(
        &self,
        session_id: &str,
        serialized: &str,
    ) -> Result<String, EngineError>;
}
