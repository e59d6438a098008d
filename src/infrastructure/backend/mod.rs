//! Remote AI backend integration

mod client;

pub use client::BackendClient;
