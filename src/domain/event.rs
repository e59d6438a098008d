//! Notifications published by the engine

use serde::{Deserialize, Serialize};

/// Engine notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    CacheCleared {
        removed: usize,
    },
    LedgerReset,
    BudgetExceeded {
        spent: f64,
        budget: f64,
    },
    ProviderFailed {
        provider_id: String,
        error: String,
    },
    ProvidersRefreshed {
        available: usize,
        total: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = EngineEvent::ProviderFailed {
            provider_id: "claude".to_string(),
            error: "timeout".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "provider_failed");
        assert_eq!(json["provider_id"], "claude");
    }
}
