//! Prompt security screening

mod gate;
mod patterns;

pub use gate::SecurityGate;
pub use patterns::{DetectorPattern, MatchFilter, builtin_patterns};
