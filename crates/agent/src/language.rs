//! Language detection and best-effort Urdu→English normalization.
//!
//! Intent rules are defined over English text, so detection runs before
//! classification. Translation rides the same provider chain; when every
//! provider fails the original text flows through with a degraded
//! confidence — downstream still functions.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::providers::{ClassificationProvider, CompletionRequest};

const TRANSLATE_SYSTEM_PROMPT: &str =
    "Translate the user's Urdu text to English. Reply with only the translation, nothing else.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Ur,
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lang::En => write!(f, "en"),
            Lang::Ur => write!(f, "ur"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub normalized_text: String,
    pub detected_lang: Lang,
    pub confidence: f32,
}

/// Any character in the Arabic-script Unicode block marks the utterance
/// as Urdu.
pub fn contains_arabic_script(text: &str) -> bool {
    text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}

pub struct LanguageDetector {
    providers: Vec<Arc<dyn ClassificationProvider>>,
    provider_timeout: Duration,
}

impl LanguageDetector {
    pub fn new(providers: Vec<Arc<dyn ClassificationProvider>>, provider_timeout: Duration) -> Self {
        Self {
            providers,
            provider_timeout,
        }
    }

    pub async fn detect(&self, utterance: &str) -> Detection {
        if !contains_arabic_script(utterance) {
            return Detection {
                normalized_text: utterance.to_string(),
                detected_lang: Lang::En,
                confidence: 1.0,
            };
        }

        for provider in &self.providers {
            if !provider.is_configured() {
                continue;
            }
            let request = CompletionRequest::new(TRANSLATE_SYSTEM_PROMPT, utterance);
            match tokio::time::timeout(self.provider_timeout, provider.complete(request)).await {
                Ok(Ok(translation)) => {
                    let translation = translation.trim();
                    if !translation.is_empty() {
                        return Detection {
                            normalized_text: translation.to_string(),
                            detected_lang: Lang::Ur,
                            confidence: 0.98,
                        };
                    }
                    tracing::warn!(provider = provider.name(), "empty translation result");
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider = provider.name(), "translation failed: {}", e);
                }
                Err(_) => {
                    tracing::warn!(provider = provider.name(), "translation timed out");
                }
            }
        }

        // Degraded, not failed: the untranslated text still flows through.
        Detection {
            normalized_text: utterance.to_string(),
            detected_lang: Lang::Ur,
            confidence: 0.5,
        }
    }
}
