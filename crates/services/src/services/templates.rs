//! Localized response templates. Pure lookups keyed by (action, lang)
//! with interpolation of returned task fields — nothing here touches the
//! store.

use agent::language::Lang;
use chrono::{DateTime, Utc};

pub fn created(lang: Lang, title: &str, due: Option<DateTime<Utc>>) -> String {
    match lang {
        Lang::En => {
            let mut msg = format!(
                "Absolutely! I've added '{}' to your todo list.",
                title
            );
            if let Some(due) = due {
                msg.push_str(&format!(" Due at: {}.", due.format("%Y-%m-%d %H:%M")));
            }
            msg.push_str(" Anything else I can help you with?");
            msg
        }
        Lang::Ur => format!(
            "ٹھیک ہے! میں نے آپ کی فہرست میں '{}' شامل کر دیا ہے۔ کوئی اور کام؟",
            title
        ),
    }
}

pub fn clarify_add_task(lang: Lang) -> String {
    match lang {
        Lang::En => "Sure! What exactly should I add to your list?".to_string(),
        Lang::Ur => "ضرور! کون سا کام فہرست میں شامل کروں؟".to_string(),
    }
}

pub fn listed(lang: Lang, count: usize) -> String {
    match lang {
        Lang::En => {
            if count == 0 {
                "No current objectives in the archives. Want to add one?".to_string()
            } else {
                format!(
                    "Here are your current tasks. You've got {} to do. Need me to prioritize any of them?",
                    if count == 1 {
                        "1 thing".to_string()
                    } else {
                        format!("{} things", count)
                    }
                )
            }
        }
        Lang::Ur => format!("آپ کی فہرست میں اس وقت {} کام ہیں۔", count),
    }
}

pub fn completed(lang: Lang, title: &str, respawned_due: Option<DateTime<Utc>>) -> String {
    match lang {
        Lang::En => match respawned_due {
            Some(due) => format!(
                "Mission Accomplished! '{}' completed. A new instance has been respawned for {}.",
                title,
                due.format("%Y-%m-%d")
            ),
            None => format!("Mission Accomplished! Objective '{}' is marked as completed.", title),
        },
        Lang::Ur => match respawned_due {
            Some(_) => format!(
                "شاباش! '{}' مکمل ہو گیا، اور اگلی باری کے لیے نیا کام شامل کر دیا گیا ہے۔",
                title
            ),
            None => format!("شاباش! '{}' مکمل ہو گیا۔", title),
        },
    }
}

pub fn already_completed(lang: Lang, title: &str) -> String {
    match lang {
        Lang::En => format!("'{}' was already completed. Nothing left to do there.", title),
        Lang::Ur => format!("'{}' پہلے ہی مکمل ہے۔", title),
    }
}

pub fn deleted(lang: Lang, title: &str) -> String {
    match lang {
        Lang::En => format!("Objective '{}' eliminated from the archives.", title),
        Lang::Ur => format!("'{}' فہرست سے مٹا دیا گیا ہے۔", title),
    }
}

pub fn timer_started(lang: Lang, title: &str) -> String {
    match lang {
        Lang::En => format!("Mission clock started for '{}'.", title),
        Lang::Ur => format!("'{}' کے لیے گھڑی شروع ہو گئی ہے۔", title),
    }
}

pub fn timer_stopped(lang: Lang, title: &str, total_seconds: i64) -> String {
    match lang {
        Lang::En => format!(
            "Mission clock stopped for '{}'. Total mission time: {} seconds.",
            title, total_seconds
        ),
        Lang::Ur => format!(
            "'{}' کی گھڑی روک دی گئی۔ کل وقت: {} سیکنڈ۔",
            title, total_seconds
        ),
    }
}

pub fn timer_not_running(lang: Lang) -> String {
    match lang {
        Lang::En => "Mission clock was not running.".to_string(),
        Lang::Ur => "گھڑی چل ہی نہیں رہی تھی۔".to_string(),
    }
}

pub fn greeting(lang: Lang, pending: usize) -> String {
    match lang {
        Lang::En => {
            if pending == 0 {
                "Welcome! Your list is clear. What's our first mission?".to_string()
            } else {
                format!(
                    "Welcome back! You've got {} open objective{}. What's our next move?",
                    pending,
                    if pending == 1 { "" } else { "s" }
                )
            }
        }
        Lang::Ur => format!(
            "السلام علیکم! آپ کی فہرست میں {} کام باقی ہیں۔ میں کیا مدد کروں؟",
            pending
        ),
    }
}

pub fn clarify(lang: Lang, utterance: &str) -> String {
    match lang {
        Lang::En => format!(
            "I hear you! You mentioned '{}'. I'm still learning, but I can help you manage your tasks. Would you like to add a new one?",
            utterance
        ),
        Lang::Ur => {
            "میں آپ کی مدد کیسے کر سکتا ہوں؟ آپ مجھے ٹاسک شامل کرنے یا مٹانے کے لیے کہہ سکتے ہیں۔"
                .to_string()
        }
    }
}

pub fn not_found(lang: Lang, reference: &str) -> String {
    match lang {
        Lang::En => format!("I couldn't find '{}' in the archives.", reference),
        Lang::Ur => format!("معاف کیجیے، مجھے '{}' نام کا کوئی کام نہیں ملا۔", reference),
    }
}

pub fn which_task(lang: Lang) -> String {
    match lang {
        Lang::En => "Which task do you mean? Give me its name or id.".to_string(),
        Lang::Ur => "کون سا کام؟ اس کا نام یا شناخت بتائیں۔".to_string(),
    }
}

pub fn failure(lang: Lang) -> String {
    match lang {
        Lang::En => "Something went wrong on my end. Please try again.".to_string(),
        Lang::Ur => "معذرت، ابھی کچھ گڑبڑ ہو گئی۔ دوبارہ کوشش کریں۔".to_string(),
    }
}
