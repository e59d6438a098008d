//! Provider catalog source trait

use async_trait::async_trait;

use super::Provider;
use crate::domain::EngineError;

#[cfg(test)]
use mockall::automock;

/// Backend collaborator that publishes the provider catalog
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProviderSource: Send + Sync {
    /// Fetches the full provider catalog
    async fn list_providers(&self) -> Result<Vec<Provider>, EngineError>;
}
