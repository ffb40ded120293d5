//! Multi-provider classification abstraction.
//!
//! Providers are interchangeable text-completion backends tried in a
//! fixed preference order; the classifier treats them uniformly.

mod anthropic;
mod openai;
mod provider_trait;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use provider_trait::{
    ClassificationProvider, CompletionRequest, ProviderError, ProviderType,
};
