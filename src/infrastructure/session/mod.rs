//! Conversation sessions and exporters

mod exporters;
mod store;

pub use exporters::{FileConversationExporter, InMemoryConversationExporter};
pub use store::{InFlightGuard, SessionLimits, SessionStore};
