//! Three-tier intent extraction: greeting fast path, delegated provider
//! chain, deterministic keyword fallback.

use std::{str::FromStr, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::{
    intent::{ClassificationResult, Intent, Slots},
    providers::{ClassificationProvider, CompletionRequest, ProviderError},
    slots,
};

/// Highest-frequency trivial inputs short-circuit before any provider
/// call.
const GREETINGS: &[&str] = &["hi", "hello", "hey", "hola", "howdy", "sup", "yo"];

const ADD_KEYWORDS: &[&str] = &["add", "buy", "new", "create", "need", "remember"];
const LIST_KEYWORDS: &[&str] = &["list", "show", "what", "todos", "tasks"];
const COMPLETE_KEYWORDS: &[&str] = &["done", "finish", "complete", "check", "solved"];

const CLASSIFY_SYSTEM_PROMPT: &str = "You classify utterances for a task-management assistant. \
Reply with only a JSON object, no prose: \
{\"intent\": \"<one of add_task, list_tasks, complete_task, delete_task, manage_timer, greeting, clarify>\", \
\"slots\": {\"item\": \"<task title or reference, or null>\"}}. \
The item excludes priority, recurrence and due-date words.";

pub struct IntentClassifier {
    providers: Vec<Arc<dyn ClassificationProvider>>,
    provider_timeout: Duration,
}

impl IntentClassifier {
    pub fn new(providers: Vec<Arc<dyn ClassificationProvider>>, provider_timeout: Duration) -> Self {
        Self {
            providers,
            provider_timeout,
        }
    }

    pub async fn classify(&self, text: &str, now: DateTime<Utc>) -> ClassificationResult {
        if is_greeting(text) {
            return ClassificationResult::bare(Intent::Greeting);
        }

        if let Some((intent, item)) = self.classify_via_providers(text).await {
            return finish(intent, item, text, now);
        }

        keyword_fallback(text, now)
    }

    /// Tier 2: first provider that answers with parseable output wins.
    /// Exceptions, timeouts and malformed output all mean "next provider".
    async fn classify_via_providers(&self, text: &str) -> Option<(Intent, Option<String>)> {
        for provider in &self.providers {
            if !provider.is_configured() {
                tracing::debug!(provider = provider.name(), "skipping unconfigured provider");
                continue;
            }
            let request = CompletionRequest::new(CLASSIFY_SYSTEM_PROMPT, text);
            match tokio::time::timeout(self.provider_timeout, provider.complete(request)).await {
                Ok(Ok(raw)) => match parse_provider_output(&raw) {
                    Ok(parsed) => {
                        tracing::debug!(provider = provider.name(), "classification succeeded");
                        return Some(parsed);
                    }
                    Err(e) => {
                        tracing::warn!(provider = provider.name(), "malformed output: {}", e);
                    }
                },
                Ok(Err(e)) => {
                    tracing::warn!(provider = provider.name(), "classification failed: {}", e);
                }
                Err(_) => {
                    tracing::warn!(provider = provider.name(), "classification timed out");
                }
            }
        }
        None
    }
}

fn is_greeting(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    GREETINGS
        .iter()
        .any(|g| t == *g || t.starts_with(&format!("{g} ")) || t.ends_with(&format!(" {g}")))
}

/// Parse a provider reply into (intent, raw item). Code fences and
/// surrounding prose are tolerated; anything else is malformed.
fn parse_provider_output(raw: &str) -> Result<(Intent, Option<String>), ProviderError> {
    let start = raw
        .find('{')
        .ok_or_else(|| ProviderError::ParseError("no JSON object in reply".to_string()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| ProviderError::ParseError("no JSON object in reply".to_string()))?;
    if end < start {
        return Err(ProviderError::ParseError("no JSON object in reply".to_string()));
    }

    let value: serde_json::Value = serde_json::from_str(&raw[start..=end])
        .map_err(|e| ProviderError::ParseError(e.to_string()))?;

    let intent_str = value["intent"]
        .as_str()
        .ok_or_else(|| ProviderError::ParseError("missing intent field".to_string()))?;
    let intent = Intent::from_str(intent_str).map_err(ProviderError::ParseError)?;

    let item = value["slots"]["item"]
        .as_str()
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty());

    Ok((intent, item))
}

/// Apply the tier-independent slot derivation rules and normalize the
/// item.
fn finish(intent: Intent, item: Option<String>, text: &str, now: DateTime<Utc>) -> ClassificationResult {
    let mut result = ClassificationResult {
        intent,
        slots: Slots {
            item: item.as_deref().and_then(slots::clean_item),
            priority: slots::scan_priority(text),
            recurrence: slots::scan_recurrence(text),
            due_date: slots::scan_due_date(text, now),
            timer_action: None,
        },
    };
    if intent == Intent::ManageTimer {
        result.slots.timer_action = Some(slots::scan_timer_action(text));
    }
    result
}

/// Tier 3: deterministic keyword heuristics over the lower-cased text.
fn keyword_fallback(text: &str, now: DateTime<Utc>) -> ClassificationResult {
    let lowered = text.to_lowercase();

    if let Some((pos, keyword)) = earliest_match(&lowered, ADD_KEYWORDS) {
        let remainder = &lowered[pos + keyword.len()..];
        return finish(Intent::AddTask, Some(remainder.to_string()), text, now);
    }

    if LIST_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return finish(Intent::ListTasks, None, text, now);
    }

    if let Some((pos, keyword)) = earliest_match(&lowered, COMPLETE_KEYWORDS) {
        let remainder = &lowered[pos + keyword.len()..];
        return finish(Intent::CompleteTask, Some(remainder.to_string()), text, now);
    }

    ClassificationResult::bare(Intent::Clarify)
}

fn earliest_match<'a>(haystack: &str, keywords: &[&'a str]) -> Option<(usize, &'a str)> {
    keywords
        .iter()
        .filter_map(|k| haystack.find(k).map(|pos| (pos, *k)))
        .min_by_key(|(pos, _)| *pos)
}
