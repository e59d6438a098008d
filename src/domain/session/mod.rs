//! Session domain - conversations and their export

mod conversation;
mod exporter;

pub use conversation::{ConversationSession, ConversationTurn, TurnRole};
pub use exporter::ConversationExporter;

#[cfg(test)]
pub use exporter::MockConversationExporter;
