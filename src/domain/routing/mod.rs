//! Routing domain - prompt classification and routing preferences

mod classifier;
mod options;

pub use classifier::{COMPLEXITY_LENGTH_THRESHOLD, PromptProfile, RoutingDecision, RoutingRule};
pub use options::RoutingOptions;
