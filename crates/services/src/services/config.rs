//! Runtime configuration, built once at process start and injected into
//! the dispatcher. Read-only after construction — no ambient lookups.

use std::{str::FromStr, sync::Arc, time::Duration};

use agent::providers::{
    AnthropicProvider, ClassificationProvider, OpenAiProvider, ProviderType,
};
use serde::Deserialize;

const DEFAULT_PROVIDER_ORDER: &[ProviderType] = &[
    ProviderType::OpenAI,
    ProviderType::Anthropic,
    ProviderType::Ollama,
];

const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HISTORY_LIMIT: i64 = 20;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Provider preference order for classification and translation.
    pub provider_order: Vec<ProviderType>,
    /// Per-attempt budget before the next provider is tried.
    pub provider_timeout: Duration,
    /// Upper bound on the history endpoint.
    pub history_limit: i64,
}

/// Optional TOML override file (`AGENT_CONFIG_PATH`).
#[derive(Debug, Default, Deserialize)]
struct AgentConfigFile {
    providers: Option<Vec<String>>,
    provider_timeout_secs: Option<u64>,
    history_limit: Option<i64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider_order: DEFAULT_PROVIDER_ORDER.to_vec(),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl AgentConfig {
    /// Environment wins over the TOML file, which wins over defaults.
    pub fn load() -> Self {
        let mut config = AgentConfig::default();

        if let Ok(path) = std::env::var("AGENT_CONFIG_PATH") {
            match std::fs::read_to_string(&path) {
                Ok(raw) => match toml::from_str::<AgentConfigFile>(&raw) {
                    Ok(file) => config.apply_file(file),
                    Err(e) => tracing::warn!("ignoring invalid config file {}: {}", path, e),
                },
                Err(e) => tracing::warn!("could not read config file {}: {}", path, e),
            }
        }

        if let Ok(raw) = std::env::var("AGENT_PROVIDERS") {
            config.provider_order = parse_provider_list(&raw);
        }
        if let Ok(raw) = std::env::var("AGENT_PROVIDER_TIMEOUT_SECS") {
            if let Ok(secs) = raw.parse::<u64>() {
                config.provider_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("AGENT_HISTORY_LIMIT") {
            if let Ok(limit) = raw.parse::<i64>() {
                config.history_limit = limit.max(1);
            }
        }

        config
    }

    fn apply_file(&mut self, file: AgentConfigFile) {
        if let Some(providers) = file.providers {
            self.provider_order = parse_provider_list(&providers.join(","));
        }
        if let Some(secs) = file.provider_timeout_secs {
            self.provider_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = file.history_limit {
            self.history_limit = limit.max(1);
        }
    }

    /// Instantiate the provider chain in preference order.
    pub fn build_providers(&self) -> Vec<Arc<dyn ClassificationProvider>> {
        self.provider_order
            .iter()
            .map(|kind| -> Arc<dyn ClassificationProvider> {
                match kind {
                    ProviderType::OpenAI => Arc::new(OpenAiProvider::new()),
                    ProviderType::Anthropic => Arc::new(AnthropicProvider::new()),
                    ProviderType::Ollama => Arc::new(OpenAiProvider::ollama()),
                }
            })
            .collect()
    }
}

fn parse_provider_list(raw: &str) -> Vec<ProviderType> {
    let providers: Vec<ProviderType> = raw
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match ProviderType::from_str(part) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!("{}", e);
                    None
                }
            }
        })
        .collect();

    if providers.is_empty() {
        DEFAULT_PROVIDER_ORDER.to_vec()
    } else {
        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_list_parses_and_preserves_order() {
        let providers = parse_provider_list("ollama, openai");
        assert_eq!(providers, vec![ProviderType::Ollama, ProviderType::OpenAI]);
    }

    #[test]
    fn unknown_providers_are_dropped() {
        let providers = parse_provider_list("openai, skynet");
        assert_eq!(providers, vec![ProviderType::OpenAI]);
    }

    #[test]
    fn empty_list_falls_back_to_defaults() {
        let providers = parse_provider_list(" , ");
        assert_eq!(providers, DEFAULT_PROVIDER_ORDER.to_vec());
    }
}
