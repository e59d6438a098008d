//! Provider Registry
//!
//! Holds the provider catalog loaded from a [`ProviderSource`] and answers
//! lookups by id, availability and category.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::EngineError;
use crate::domain::provider::{Provider, ProviderCategory, ProviderSource};

#[derive(Debug, Default)]
struct Catalog {
    providers: Vec<Provider>,
    /// id -> position in `providers`
    index: HashMap<String, usize>,
}

impl Catalog {
    fn from_providers(providers: Vec<Provider>) -> Self {
        let index = providers
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Self { providers, index }
    }

    fn get(&self, id: &str) -> Option<&Provider> {
        self.index.get(id).map(|&i| &self.providers[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Provider> {
        match self.index.get(id) {
            Some(&i) => self.providers.get_mut(i),
            None => None,
        }
    }
}

/// Catalog of the providers the engine can route to
pub struct ProviderRegistry {
    source: Arc<dyn ProviderSource>,
    catalog: RwLock<Catalog>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").finish_non_exhaustive()
    }
}

impl ProviderRegistry {
    pub fn new(source: Arc<dyn ProviderSource>) -> Self {
        Self {
            source,
            catalog: RwLock::new(Catalog::default()),
        }
    }

    /// Loads the catalog from the source
    ///
    /// Never fails: when the source errors or publishes nothing usable, a
    /// single general-purpose fallback provider is installed instead.
    pub async fn initialize(&self) -> Vec<Provider> {
        let providers = match self.source.list_providers().await {
            Ok(listed) => {
                let accepted = sanitize(listed);
                if accepted.is_empty() {
                    warn!("Provider source returned no usable providers, installing fallback");
                    vec![Provider::fallback()]
                } else {
                    accepted
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to load providers, installing fallback");
                vec![Provider::fallback()]
            }
        };

        info!(
            total = providers.len(),
            available = providers.iter().filter(|p| p.is_available).count(),
            "Provider catalog loaded"
        );

        *self.catalog.write().await = Catalog::from_providers(providers.clone());
        providers
    }

    /// Re-queries the source and updates availability of known providers
    ///
    /// Returns the number of providers whose availability changed. Providers
    /// the registry has not seen before are ignored.
    pub async fn refresh(&self) -> Result<usize, EngineError> {
        let listed = self.source.list_providers().await.map_err(|e| {
            warn!(error = %e, "Provider refresh failed, keeping current catalog");
            e
        })?;

        let mut catalog = self.catalog.write().await;
        let mut changed = 0;

        for update in listed {
            match catalog.get_mut(&update.id) {
                Some(known) if known.is_available != update.is_available => {
                    debug!(
                        provider_id = %known.id,
                        is_available = update.is_available,
                        "Provider availability changed"
                    );
                    known.is_available = update.is_available;
                    changed += 1;
                }
                Some(_) => {}
                None => {
                    debug!(provider_id = %update.id, "Ignoring unknown provider on refresh");
                }
            }
        }

        Ok(changed)
    }

    /// Returns false when the provider is unknown
    pub async fn set_availability(&self, id: &str, is_available: bool) -> bool {
        let mut catalog = self.catalog.write().await;
        match catalog.get_mut(id) {
            Some(provider) => {
                provider.is_available = is_available;
                info!(provider_id = %id, is_available, "Provider availability set");
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Provider> {
        self.catalog.read().await.get(id).cloned()
    }

    pub async fn all(&self) -> Vec<Provider> {
        self.catalog.read().await.providers.clone()
    }

    pub async fn available(&self) -> Vec<Provider> {
        self.catalog
            .read()
            .await
            .providers
            .iter()
            .filter(|p| p.is_available)
            .cloned()
            .collect()
    }

    pub async fn by_category(&self, category: ProviderCategory) -> Vec<Provider> {
        self.catalog
            .read()
            .await
            .providers
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect()
    }

    pub async fn cheapest_available(&self) -> Option<Provider> {
        cheapest(self.available().await.iter()).cloned()
    }

    pub async fn most_expensive_available(&self) -> Option<Provider> {
        most_expensive(self.available().await.iter()).cloned()
    }

    pub async fn len(&self) -> usize {
        self.catalog.read().await.providers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Drops invalid entries and duplicate ids, keeping the first occurrence
fn sanitize(listed: Vec<Provider>) -> Vec<Provider> {
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(listed.len());

    for provider in listed {
        if let Err(e) = provider.validate() {
            warn!(provider_id = %provider.id, error = %e, "Skipping invalid provider");
            continue;
        }
        if !seen.insert(provider.id.clone()) {
            warn!(provider_id = %provider.id, "Skipping duplicate provider id");
            continue;
        }
        accepted.push(provider);
    }

    accepted
}

/// Lowest cost_per_token; ties keep the earliest provider
pub fn cheapest<'a>(providers: impl Iterator<Item = &'a Provider>) -> Option<&'a Provider> {
    providers.fold(None, |best: Option<&Provider>, p| match best {
        Some(b) if b.cost_per_token <= p.cost_per_token => Some(b),
        _ => Some(p),
    })
}

/// Highest cost_per_token; ties keep the earliest provider
pub fn most_expensive<'a>(providers: impl Iterator<Item = &'a Provider>) -> Option<&'a Provider> {
    providers.fold(None, |best: Option<&Provider>, p| match best {
        Some(b) if b.cost_per_token >= p.cost_per_token => Some(b),
        _ => Some(p),
    })
}
