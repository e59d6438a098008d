//! Chat request/response models

mod request;
mod response;

pub use request::{ChatRequest, SecurityContext, SendMessage};
pub use response::{ChatResponse, TokenUsage};
