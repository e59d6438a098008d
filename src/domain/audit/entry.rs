//! Audit trail entries

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    SendMessage,
    SecurityRejection,
    RateLimited,
    ProviderFailure,
    CacheCleared,
    LedgerReset,
    ConversationExport,
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendMessage => write!(f, "send_message"),
            Self::SecurityRejection => write!(f, "security_rejection"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ProviderFailure => write!(f, "provider_failure"),
            Self::CacheCleared => write!(f, "cache_cleared"),
            Self::LedgerReset => write!(f, "ledger_reset"),
            Self::ConversationExport => write!(f, "conversation_export"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// One record of the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: String,
    pub timestamp: DateTime<Utc>,
    pub operation: AuditOperation,
    /// Resource the operation touched (provider id, cache, ledger, ...)
    pub resource: String,
    pub outcome: AuditOutcome,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub compliance_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl AuditEntry {
    pub fn new(
        operation: AuditOperation,
        resource: impl Into<String>,
        outcome: AuditOutcome,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            audit_id: format!("audit-{}", Uuid::new_v4()),
            timestamp,
            operation,
            resource: resource.into(),
            outcome,
            risk_level: RiskLevel::Low,
            compliance_flags: Vec::new(),
            session_id: None,
            details: BTreeMap::new(),
        }
    }

    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_compliance_flags(mut self, flags: Vec<String>) -> Self {
        self.compliance_flags = flags;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }
}
