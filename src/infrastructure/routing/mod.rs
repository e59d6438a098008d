//! Provider recommendation

mod engine;

pub use engine::{RoutingEngine, complexity_score, select};
