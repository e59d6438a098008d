//! Conversation exporter implementations

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::domain::EngineError;
use crate::domain::session::ConversationExporter;

/// Keeps exports in memory, keyed by their location
#[derive(Debug, Default)]
pub struct InMemoryConversationExporter {
    exports: Mutex<HashMap<String, String>>,
}

impl InMemoryConversationExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, location: &str) -> Option<String> {
        self.exports.lock().await.get(location).cloned()
    }

    pub async fn len(&self) -> usize {
        self.exports.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ConversationExporter for InMemoryConversationExporter {
    async fn export_conversation(
        &self,
        session_id: &str,
        serialized: &str,
    ) -> Result<String, EngineError> {
        let location = format!("memory://conversations/{}/{}", session_id, Uuid::new_v4());
        self.exports
            .lock()
            .await
            .insert(location.clone(), serialized.to_string());
        Ok(location)
    }
}

/// Writes each export as a JSON file under a directory
#[derive(Debug, Clone)]
pub struct FileConversationExporter {
    directory: PathBuf,
}

impl FileConversationExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }
}

/// Keeps file names portable
fn file_stem(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[async_trait]
impl ConversationExporter for FileConversationExporter {
    async fn export_conversation(
        &self,
        session_id: &str,
        serialized: &str,
    ) -> Result<String, EngineError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| EngineError::export(format!("cannot create export directory: {}", e)))?;

        let path = self.directory.join(format!(
            "{}-{}.json",
            file_stem(session_id),
            Uuid::new_v4().simple()
        ));

        tokio::fs::write(&path, serialized)
            .await
            .map_err(|e| EngineError::export(format!("cannot write {}: {}", path.display(), e)))?;

        info!(session_id = %session_id, path = %path.display(), "Conversation exported");
        Ok(path.display().to_string())
    }
}
