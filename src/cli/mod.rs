//! CLI module for the AI routing engine
//!
//! Provides subcommands that drive a [`RoutingService`](crate::RoutingService)
//! built from the application configuration:
//! - `providers`: list the provider catalog
//! - `recommend`: show which provider a prompt would be routed to
//! - `send`: send prompts and print the responses
//! - `stats`: replay prompts and print cost and cache statistics

mod commands;

use clap::{Args, Parser, Subcommand};

pub use commands::{build_service, run};

/// AI Router - cost-aware routing across multiple AI providers
#[derive(Parser)]
#[command(name = "ai-router")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List configured providers and their availability
    Providers,

    /// Show the provider the router would pick for a prompt
    Recommend(RecommendArgs),

    /// Send one or more prompts through the engine
    Send(SendArgs),

    /// Replay prompts and print cost ledger and cache statistics
    Stats(StatsArgs),
}

#[derive(Args)]
pub struct RecommendArgs {
    pub prompt: String,

    /// Only consider providers at or above this quality
    #[arg(long)]
    pub min_quality: Option<f64>,

    /// Only consider providers whose estimated exchange cost fits (USD)
    #[arg(long)]
    pub max_budget: Option<f64>,

    /// Provider ids to leave out
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,
}

#[derive(Args)]
pub struct SendArgs {
    /// Prompts, sent in order on the same session
    #[arg(required = true)]
    pub prompts: Vec<String>,

    #[arg(long, default_value = "cli")]
    pub session: String,

    /// Pin a provider instead of routing automatically
    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Extra context sent alongside each prompt
    #[arg(long)]
    pub context: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Export the conversation after sending
    #[arg(long)]
    pub export: bool,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Prompts to replay before reporting
    pub prompts: Vec<String>,
}
