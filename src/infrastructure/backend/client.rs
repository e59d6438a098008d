//! HTTP/JSON client for the AI backend
//!
//! Implements every collaborator trait against the backend's versioned
//! endpoints. Replies are validated by the wire schemas before they reach
//! the engine.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::EngineError;
use crate::domain::audit::{AuditEntry, AuditSink};
use crate::domain::provider::{Provider, ProviderAdapter, ProviderCall, ProviderReply, ProviderSource};
use crate::domain::session::ConversationExporter;
use crate::domain::wire::{
    AuditBatchV1, ExportReceiptV1, ExportRequestV1, GenerateRequestV1, ProviderListV1,
    ProviderReplyV1, SCHEMA_VERSION,
};

const PROVIDERS_PATH: &str = "/v1/providers";
const GENERATE_PATH: &str = "/v1/generate";
const AUDIT_PATH: &str = "/v1/audit/batches";
const EXPORT_PATH: &str = "/v1/conversations/export";

#[derive(Debug)]
enum HttpFailure {
    Timeout,
    Other(String),
}

impl std::fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Other(message) => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BackendClient {
    /// `request_timeout` bounds the catalog, audit and export calls;
    /// generate calls use the deadline carried by the call
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EngineError::configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, HttpFailure> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                HttpFailure::Timeout
            } else {
                HttpFailure::Other(format!("Request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(HttpFailure::Other(format!("HTTP {}: {}", status, error_body)));
        }

        Ok(response)
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, HttpFailure> {
        self.execute(request)
            .await?
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HttpFailure::Timeout
                } else {
                    HttpFailure::Other(format!("Failed to parse response: {}", e))
                }
            })
    }
}

#[async_trait]
impl ProviderSource for BackendClient {
    async fn list_providers(&self) -> Result<Vec<Provider>, EngineError> {
        let list: ProviderListV1 = self
            .execute_json(self.client.get(self.url(PROVIDERS_PATH)))
            .await
            .map_err(|e| EngineError::provider("backend", e.to_string()))?;

        let providers = list.into_providers()?;
        debug!(count = providers.len(), "Fetched provider catalog");
        Ok(providers)
    }
}

#[async_trait]
impl ProviderAdapter for BackendClient {
    async fn generate(&self, call: ProviderCall) -> Result<ProviderReply, EngineError> {
        let body = GenerateRequestV1::from(&call);
        let request = self
            .client
            .post(self.url(GENERATE_PATH))
            .timeout(call.deadline)
            .json(&body);

        let reply: ProviderReplyV1 = self.execute_json(request).await.map_err(|e| match e {
            HttpFailure::Timeout => EngineError::timeout(call.deadline),
            HttpFailure::Other(message) => EngineError::provider(&call.provider_id, message),
        })?;

        reply.into_reply()
    }

    fn adapter_name(&self) -> &'static str {
        "backend"
    }
}

#[async_trait]
impl AuditSink for BackendClient {
    async fn persist_audit_batch(&self, entries: &[AuditEntry]) -> Result<(), EngineError> {
        let body = AuditBatchV1::new(entries);
        self.execute(self.client.post(self.url(AUDIT_PATH)).json(&body))
            .await
            .map_err(|e| EngineError::audit(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ConversationExporter for BackendClient {
    async fn export_conversation(
        &self,
        session_id: &str,
        serialized: &str,
    ) -> Result<String, EngineError> {
        let body = ExportRequestV1 {
            schema_version: SCHEMA_VERSION,
            session_id: session_id.to_string(),
            payload: serialized.to_string(),
        };

        let receipt: ExportReceiptV1 = self
            .execute_json(self.client.post(self.url(EXPORT_PATH)).json(&body))
            .await
            .map_err(|e| EngineError::export(e.to_string()))?;

        receipt.into_location()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::domain::audit::{AuditOperation, AuditOutcome};

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn call(deadline: Duration) -> ProviderCall {
        ProviderCall {
            request_id: "req-1".to_string(),
            provider_id: "claude".to_string(),
            model: "claude-3-5-sonnet".to_string(),
            prompt: "Explain lifetimes".to_string(),
            context: None,
            temperature: 0.7,
            max_tokens: 1000,
            deadline,
        }
    }

    #[tokio::test]
    async fn test_list_providers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/providers"))
            .and(header("authorization", "Bearer secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schema_version": 1,
                "providers": [
                    { "id": "gemini", "name": "Gemini", "category": "fast_cheap", "cost_per_token": 0.0000004 },
                    { "id": "claude", "name": "Claude", "category": "reasoning_specialized", "cost_per_token": 0.00001,
                      "specialties": ["reasoning", "code"], "security_level": "enterprise" }
                ]
            })))
            .mount(&server)
            .await;

        let providers = client(&server)
            .with_api_key("secret-key")
            .list_providers()
            .await
            .unwrap();

        assert_eq!(providers.len(), 2);
        assert!(providers[0].is_available);
        assert!(providers[1].has_specialty("code"));
    }

    #[tokio::test]
    async fn test_list_providers_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/providers"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client(&server).list_providers().await.unwrap_err();

        assert!(matches!(err, EngineError::Provider { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_generate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .and(body_partial_json(json!({
                "schema_version": 1,
                "provider_id": "claude",
                "timeout_ms": 30000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schema_version": 1,
                "content": "References must not outlive their referent.",
                "confidence": 0.95,
                "usage": { "prompt_tokens": 4, "completion_tokens": 9 },
                "cost": 0.00013
            })))
            .mount(&server)
            .await;

        let reply = client(&server)
            .generate(call(Duration::from_secs(30)))
            .await
            .unwrap();

        assert_eq!(reply.usage.total_tokens, 13);
        assert_eq!(reply.cost, Some(0.00013));
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schema_version": 1,
                "content": "ok",
                "confidence": 3.0,
                "usage": { "prompt_tokens": 1, "completion_tokens": 1 }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .generate(call(Duration::from_secs(30)))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidReply { .. }));
    }

    #[tokio::test]
    async fn test_generate_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(json!({})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .generate(call(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Timeout { timeout_ms: 50 }));
    }

    #[tokio::test]
    async fn test_persist_audit_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audit/batches"))
            .and(body_partial_json(json!({ "schema_version": 1 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let entry = AuditEntry::new(AuditOperation::SendMessage, "gemini", AuditOutcome::Success, Utc::now());

        client(&server).persist_audit_batch(&[entry]).await.unwrap();
    }

    #[tokio::test]
    async fn test_persist_audit_batch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audit/batches"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).persist_audit_batch(&[]).await.unwrap_err();

        assert!(matches!(err, EngineError::Audit { .. }));
    }

    #[tokio::test]
    async fn test_export_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/conversations/export"))
            .and(body_partial_json(json!({ "session_id": "s-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schema_version": 1,
                "location": "s3://exports/s-1.json"
            })))
            .mount(&server)
            .await;

        let location = client(&server)
            .export_conversation("s-1", "{}")
            .await
            .unwrap();

        assert_eq!(location, "s3://exports/s-1.json");
    }
}
