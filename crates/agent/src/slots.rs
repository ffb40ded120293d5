//! Deterministic slot derivation over normalized English text. These
//! rules run no matter which classification tier produced the intent.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use db::models::task::{Recurrence, TaskPriority};
use regex::Regex;

use crate::intent::TimerAction;

/// Item values too vague to become a task title.
pub const ITEM_STOPLIST: &[&str] = &["something", "task", "todo", "it"];

fn due_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bin\s+(\d+)\s+(minute|min|hour|hr|day)s?\b").expect("due regex")
    })
}

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(urgent|asap|important|high|low|priority|daily|weekly|monthly|tomorrow|every\s+(day|week|month))\b",
        )
        .expect("keyword regex")
    })
}

pub fn scan_priority(text: &str) -> TaskPriority {
    let t = text.to_lowercase();
    if word_present(&t, "urgent") || word_present(&t, "asap") {
        TaskPriority::Urgent
    } else if word_present(&t, "high") || word_present(&t, "important") {
        TaskPriority::High
    } else if word_present(&t, "low") {
        TaskPriority::Low
    } else {
        TaskPriority::Medium
    }
}

pub fn scan_recurrence(text: &str) -> Recurrence {
    let t = text.to_lowercase();
    if word_present(&t, "daily") || t.contains("every day") {
        Recurrence::Daily
    } else if word_present(&t, "weekly") || t.contains("every week") {
        Recurrence::Weekly
    } else if word_present(&t, "monthly") || t.contains("every month") {
        Recurrence::Monthly
    } else {
        Recurrence::None
    }
}

/// Resolve a relative time expression to an absolute instant. Absence of
/// any time expression yields `None`.
pub fn scan_due_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(caps) = due_regex().captures(text) {
        let amount: i64 = caps[1].parse().ok()?;
        let due = match caps[2].to_lowercase().as_str() {
            "minute" | "min" => now + Duration::minutes(amount),
            "hour" | "hr" => now + Duration::hours(amount),
            "day" => now + Duration::days(amount),
            _ => return None,
        };
        return Some(due);
    }
    if text.to_lowercase().contains("tomorrow") {
        return Some(now + Duration::days(1));
    }
    None
}

pub fn scan_timer_action(text: &str) -> TimerAction {
    let t = text.to_lowercase();
    if word_present(&t, "stop") || word_present(&t, "pause") || word_present(&t, "end") {
        TimerAction::Stop
    } else {
        TimerAction::Start
    }
}

/// Normalize a raw item: drop recognized priority/recurrence/due keywords,
/// trim punctuation, reject stoplist leftovers, capitalize.
pub fn clean_item(raw: &str) -> Option<String> {
    let without_due = due_regex().replace_all(raw, " ");
    let without_keywords = keyword_regex().replace_all(&without_due, " ");

    let cleaned = without_keywords
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());

    if cleaned.is_empty() || ITEM_STOPLIST.contains(&cleaned.to_lowercase().as_str()) {
        return None;
    }
    Some(capitalize(cleaned))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn word_present(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}
