//! OpenAI provider implementation. Also serves Ollama through its
//! OpenAI-compatible chat endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::provider_trait::{
    ClassificationProvider, CompletionRequest, ProviderError, ProviderType,
};

pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    kind: ProviderType,
}

impl OpenAiProvider {
    pub fn new() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        if api_key.is_none() {
            tracing::warn!("OpenAI provider created without OPENAI_API_KEY");
        }

        Self {
            client: Client::new(),
            api_key,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            kind: ProviderType::OpenAI,
        }
    }

    /// Ollama served through the same wire format; no API key required.
    pub fn ollama() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("OLLAMA_PORT").unwrap_or_else(|_| "11434".to_string());

        Self {
            client: Client::new(),
            api_key: None,
            endpoint: format!("http://{}:{}/v1/chat/completions", host, port),
            model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            kind: ProviderType::Ollama,
        }
    }
}

#[async_trait]
impl ClassificationProvider for OpenAiProvider {
    fn provider_type(&self) -> ProviderType {
        self.kind
    }

    fn name(&self) -> &'static str {
        match self.kind {
            ProviderType::Ollama => "ollama",
            _ => "openai",
        }
    }

    fn is_configured(&self) -> bool {
        // Local Ollama needs no credentials.
        self.kind == ProviderType::Ollama || self.api_key.is_some()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user }
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::ParseError("missing message content".to_string()))
    }
}
