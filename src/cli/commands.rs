//! Subcommand implementations

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use super::{Cli, Command, RecommendArgs, SendArgs, StatsArgs};
use crate::config::{AppConfig, BackendMode};
use crate::domain::SendMessage;
use crate::domain::routing::RoutingOptions;
use crate::infrastructure::audit::TracingAuditSink;
use crate::infrastructure::backend::BackendClient;
use crate::infrastructure::provider::{FixtureProviderAdapter, StaticProviderSource};
use crate::infrastructure::services::{RoutingService, RoutingServiceConfig};
use crate::infrastructure::session::FileConversationExporter;

/// Run a parsed command against a freshly built service
pub async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    let service = build_service(config)?;
    let providers = service.initialize().await;
    info!(providers = providers.len(), mode = ?config.backend.mode, "Engine ready");

    match cli.command {
        Command::Providers => print_json(&providers),
        Command::Recommend(args) => recommend(&service, args).await,
        Command::Send(args) => send(&service, args).await,
        Command::Stats(args) => stats(&service, args).await,
    }
}

/// Wires the service collaborators for the configured backend mode
pub fn build_service(config: &AppConfig) -> anyhow::Result<RoutingService> {
    let service_config = RoutingServiceConfig::from(&config.engine);

    let service = match config.backend.mode {
        BackendMode::Fixture => {
            let source = if config.providers.is_empty() {
                StaticProviderSource::with_default_catalog()
            } else {
                StaticProviderSource::new(config.providers.clone())
            };

            RoutingService::builder(Arc::new(source), Arc::new(FixtureProviderAdapter::new()))
                .with_audit_sink(Arc::new(TracingAuditSink))
                .with_exporter(Arc::new(FileConversationExporter::new(
                    config.backend.export_dir.clone(),
                )))
                .with_config(service_config)
                .build()
        }
        BackendMode::Http => {
            let mut client =
                BackendClient::new(&config.backend.base_url, config.backend.request_timeout())
                    .context("Failed to create backend client")?;
            if let Some(api_key) = &config.backend.api_key {
                client = client.with_api_key(api_key);
            }
            let client = Arc::new(client);

            RoutingService::builder(client.clone(), client.clone())
                .with_audit_sink(client.clone())
                .with_exporter(client)
                .with_config(service_config)
                .build()
        }
    };

    Ok(service)
}

async fn recommend(service: &RoutingService, args: RecommendArgs) -> anyhow::Result<()> {
    let mut options = RoutingOptions::default();
    if let Some(minimum) = args.min_quality {
        options = options.with_minimum_quality(minimum);
    }
    if let Some(budget) = args.max_budget {
        options = options.with_max_budget(budget);
    }
    for id in args.exclude {
        options = options.exclude(id);
    }

    match service.decide(&args.prompt, &options).await {
        Some(decision) => print_json(&decision),
        None => anyhow::bail!("No provider available for this prompt"),
    }
}

async fn send(service: &RoutingService, args: SendArgs) -> anyhow::Result<()> {
    for prompt in args.prompts {
        let mut message = SendMessage::new(&args.session, prompt);
        if let Some(context) = &args.context {
            message = message.with_context(context);
        }
        if let Some(provider) = &args.provider {
            message = message.with_provider(provider);
        }
        if let Some(model) = &args.model {
            message = message.with_model(model);
        }
        if let Some(temperature) = args.temperature {
            message = message.with_temperature(temperature);
        }
        if let Some(max_tokens) = args.max_tokens {
            message = message.with_max_tokens(max_tokens);
        }

        let response = service.send_message(message).await?;
        print_json(&response)?;
    }

    if args.export {
        let location = service.export_conversation(&args.session).await?;
        println!("Conversation exported to {}", location);
    }

    finish(service).await;
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatsReport {
    ledger: crate::domain::CostSnapshot,
    cache: crate::domain::CacheStats,
    cache_hit_rate: f64,
    rate_limit: crate::domain::RateLimitStatus,
}

impl StatsReport {
    async fn collect(service: &RoutingService) -> Self {
        let cache = service.cache_stats().await;
        Self {
            ledger: service.cost_snapshot().await,
            cache_hit_rate: cache.hit_rate(),
            cache,
            rate_limit: service.rate_limit_status().await,
        }
    }
}

async fn stats(service: &RoutingService, args: StatsArgs) -> anyhow::Result<()> {
    for prompt in args.prompts {
        if let Err(e) = service.send_message(SendMessage::new("stats", prompt)).await {
            warn!(error = %e, "Replay failed");
        }
    }

    let report = StatsReport::collect(service).await;
    finish(service).await;
    print_json(&report)
}

async fn finish(service: &RoutingService) {
    if let Err(e) = service.flush_audit().await {
        warn!(error = %e, "Audit entries could not be flushed");
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stats_report_includes_hit_rate() {
        let service = build_service(&AppConfig::default()).unwrap();
        service.initialize().await;
        for _ in 0..4 {
            service
                .send_message(SendMessage::new("stats", "Explain ownership in Rust"))
                .await
                .unwrap();
        }

        let report = StatsReport::collect(&service).await;
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["cache_hit_rate"], 0.75);
        assert_eq!(json["cache"]["hits"], 3);
        assert_eq!(json["ledger"]["request_count"], 1);
    }
}
