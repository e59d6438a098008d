//! Prompt validation boundary

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// A sensitive-data match found in a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityFinding {
    /// Name of the detector that matched
    pub detector: String,
    /// Byte offset of the match in the scanned text
    pub offset: usize,
}

/// Screens outbound text for sensitive material
pub trait Validator: Send + Sync + Debug {
    /// First finding in `text`, if any
    fn scan(&self, text: &str) -> Option<SecurityFinding>;

    /// Whether `text` may leave the process
    fn validate(&self, text: &str) -> bool {
        self.scan(text).is_none()
    }
}
