//! The dispatch pipeline: utterance → detect → classify → route → respond
//! → log. A linear state machine per call with no back-edges; late-stage
//! failures never roll back earlier effects.

use agent::{
    IntentClassifier, LanguageDetector,
    intent::{Intent, Slots, TimerAction},
    language::{Detection, Lang},
};
use chrono::Utc;
use db::models::task::{CreateTask, Task, TaskError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::services::{config::AgentConfig, interaction_log, recurrence, templates};

/// Closed set of action labels the router can produce. The wire labels
/// come from `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    ClarifyAddTask,
    List,
    Update,
    Delete,
    Timer,
    Greeting,
    Clarify,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::ClarifyAddTask => "clarify_add_task",
            Action::List => "list",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Timer => "timer",
            Action::Greeting => "greeting",
            Action::Clarify => "clarify",
        };
        write!(f, "{}", s)
    }
}

/// Pipeline stages, for tracing only — never persisted.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Received,
    Detected,
    Classified,
    Routed,
    Responded,
    Logged,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Received => "received",
            Stage::Detected => "detected",
            Stage::Classified => "classified",
            Stage::Routed => "routed",
            Stage::Responded => "responded",
            Stage::Logged => "logged",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub action: Action,
    pub result: Value,
    pub message: String,
}

pub struct Dispatcher {
    pool: SqlitePool,
    detector: LanguageDetector,
    classifier: IntentClassifier,
}

impl Dispatcher {
    pub fn new(pool: SqlitePool, config: &AgentConfig) -> Self {
        let providers = config.build_providers();
        Self {
            pool,
            detector: LanguageDetector::new(providers.clone(), config.provider_timeout),
            classifier: IntentClassifier::new(providers, config.provider_timeout),
        }
    }

    /// Process one authenticated utterance end-to-end. Store failures
    /// degrade to a clarify response; they never crash the dispatch.
    pub async fn dispatch(&self, user_id: &str, utterance: &str, voice: bool) -> DispatchOutcome {
        let utterance = utterance.trim();
        tracing::debug!(stage = %Stage::Received, user_id, "dispatching utterance");

        let detection = self.detector.detect(utterance).await;
        tracing::debug!(
            stage = %Stage::Detected,
            lang = %detection.detected_lang,
            confidence = detection.confidence,
        );

        let classification = self
            .classifier
            .classify(&detection.normalized_text, Utc::now())
            .await;
        tracing::debug!(stage = %Stage::Classified, intent = %classification.intent);

        let lang = detection.detected_lang;
        let mut outcome = match self
            .route(user_id, classification.intent, &classification.slots, &detection)
            .await
        {
            Ok(outcome) => outcome,
            Err(TaskError::NotFound) => {
                let reference = classification.slots.item.as_deref().unwrap_or(utterance);
                DispatchOutcome {
                    action: action_for_intent(classification.intent),
                    result: json!({ "error": "not_found" }),
                    message: templates::not_found(lang, reference),
                }
            }
            Err(e) => {
                tracing::error!("store operation failed: {}", e);
                DispatchOutcome {
                    action: Action::Clarify,
                    result: json!({}),
                    message: templates::failure(lang),
                }
            }
        };
        tracing::debug!(stage = %Stage::Routed, action = %outcome.action);

        if voice {
            outcome.result["voice"] = json!(true);
        }
        tracing::debug!(stage = %Stage::Responded);

        interaction_log::record(
            &self.pool,
            user_id,
            utterance,
            &outcome.action.to_string(),
            &outcome.message,
        )
        .await;
        tracing::debug!(stage = %Stage::Logged);

        outcome
    }

    async fn route(
        &self,
        user_id: &str,
        intent: Intent,
        slots: &Slots,
        detection: &Detection,
    ) -> Result<DispatchOutcome, TaskError> {
        let lang = detection.detected_lang;
        match intent {
            Intent::AddTask => match &slots.item {
                Some(item) => self.create_task(user_id, item, slots, lang).await,
                None => Ok(DispatchOutcome {
                    action: Action::ClarifyAddTask,
                    result: json!({}),
                    message: templates::clarify_add_task(lang),
                }),
            },
            Intent::ListTasks => self.list_tasks(user_id, lang).await,
            Intent::CompleteTask => match &slots.item {
                Some(item) => self.complete_task(user_id, item, lang).await,
                None => Ok(which_task(lang)),
            },
            Intent::DeleteTask => match &slots.item {
                Some(item) => self.delete_task(user_id, item, lang).await,
                None => Ok(which_task(lang)),
            },
            Intent::ManageTimer => match &slots.item {
                Some(item) => {
                    let action = slots.timer_action.unwrap_or(TimerAction::Start);
                    self.manage_timer(user_id, item, action, lang).await
                }
                None => Ok(which_task(lang)),
            },
            Intent::Greeting => self.greet(user_id, lang).await,
            Intent::Clarify => Ok(DispatchOutcome {
                action: Action::Clarify,
                result: json!({}),
                message: templates::clarify(lang, &detection.normalized_text),
            }),
        }
    }

    async fn create_task(
        &self,
        user_id: &str,
        item: &str,
        slots: &Slots,
        lang: Lang,
    ) -> Result<DispatchOutcome, TaskError> {
        let task = Task::create(
            &self.pool,
            &CreateTask {
                user_id: user_id.to_string(),
                title: item.to_string(),
                priority: Some(slots.priority),
                recurrence: Some(slots.recurrence),
                due_date: slots.due_date,
                tags: None,
            },
        )
        .await?;

        let message = templates::created(lang, &task.title, task.due_date);
        Ok(DispatchOutcome {
            action: Action::Create,
            result: json!({
                "task": task.title,
                "id": task.id,
                "priority": task.priority,
                "recurrence": task.recurrence,
                "due_date": task.due_date,
            }),
            message,
        })
    }

    async fn list_tasks(&self, user_id: &str, lang: Lang) -> Result<DispatchOutcome, TaskError> {
        let tasks = Task::find_by_user(&self.pool, user_id).await?;
        let message = templates::listed(lang, tasks.len());
        Ok(DispatchOutcome {
            action: Action::List,
            result: json!({ "tasks": tasks }),
            message,
        })
    }

    async fn complete_task(
        &self,
        user_id: &str,
        item: &str,
        lang: Lang,
    ) -> Result<DispatchOutcome, TaskError> {
        let task = Task::find_by_reference(&self.pool, user_id, item)
            .await?
            .ok_or(TaskError::NotFound)?;

        let report = recurrence::complete_with_respawn(&self.pool, task.id, user_id, Utc::now()).await?;
        let message = if report.already_completed {
            templates::already_completed(lang, &report.task.title)
        } else {
            templates::completed(
                lang,
                &report.task.title,
                report.respawned.as_ref().and_then(|t| t.due_date),
            )
        };
        Ok(DispatchOutcome {
            action: Action::Update,
            result: json!({
                "task": report.task.title,
                "id": report.task.id,
                "status": report.task.status,
                "already_completed": report.already_completed,
                "respawned": report.respawned,
            }),
            message,
        })
    }

    async fn delete_task(
        &self,
        user_id: &str,
        item: &str,
        lang: Lang,
    ) -> Result<DispatchOutcome, TaskError> {
        let task = Task::find_by_reference(&self.pool, user_id, item)
            .await?
            .ok_or(TaskError::NotFound)?;

        let deleted = Task::delete(&self.pool, task.id, user_id).await?;
        if deleted == 0 {
            return Err(TaskError::NotFound);
        }
        let message = templates::deleted(lang, &task.title);
        Ok(DispatchOutcome {
            action: Action::Delete,
            result: json!({ "task": task.title, "id": task.id }),
            message,
        })
    }

    async fn manage_timer(
        &self,
        user_id: &str,
        item: &str,
        action: TimerAction,
        lang: Lang,
    ) -> Result<DispatchOutcome, TaskError> {
        let task = Task::find_by_reference(&self.pool, user_id, item)
            .await?
            .ok_or(TaskError::NotFound)?;

        match action {
            TimerAction::Start => {
                let task = Task::start_timer(&self.pool, task.id, user_id, Utc::now()).await?;
                let message = templates::timer_started(lang, &task.title);
                Ok(DispatchOutcome {
                    action: Action::Timer,
                    result: json!({ "task": task.title, "id": task.id, "timer": "start" }),
                    message,
                })
            }
            TimerAction::Stop => {
                match Task::stop_timer(&self.pool, task.id, user_id, Utc::now()).await {
                    Ok(task) => {
                        let message =
                            templates::timer_stopped(lang, &task.title, task.total_time_spent);
                        Ok(DispatchOutcome {
                            action: Action::Timer,
                            result: json!({
                                "task": task.title,
                                "id": task.id,
                                "timer": "stop",
                                "total_time_spent": task.total_time_spent,
                            }),
                            message,
                        })
                    }
                    // Reported, not crashed: the clock simply wasn't running.
                    Err(TaskError::TimerNotRunning) => Ok(DispatchOutcome {
                        action: Action::Timer,
                        result: json!({ "task": task.title, "error": "timer_not_running" }),
                        message: templates::timer_not_running(lang),
                    }),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Greeting reads the task list for display only.
    async fn greet(&self, user_id: &str, lang: Lang) -> Result<DispatchOutcome, TaskError> {
        let tasks = Task::find_by_user(&self.pool, user_id).await?;
        let pending = tasks
            .iter()
            .filter(|t| t.status == db::models::task::TaskStatus::Pending)
            .count();
        Ok(DispatchOutcome {
            action: Action::Greeting,
            result: json!({ "pending": pending }),
            message: templates::greeting(lang, pending),
        })
    }
}

fn action_for_intent(intent: Intent) -> Action {
    match intent {
        Intent::AddTask => Action::Create,
        Intent::ListTasks => Action::List,
        Intent::CompleteTask => Action::Update,
        Intent::DeleteTask => Action::Delete,
        Intent::ManageTimer => Action::Timer,
        Intent::Greeting => Action::Greeting,
        Intent::Clarify => Action::Clarify,
    }
}

fn which_task(lang: Lang) -> DispatchOutcome {
    DispatchOutcome {
        action: Action::Clarify,
        result: json!({}),
        message: templates::which_task(lang),
    }
}

#[cfg(test)]
mod tests {
    use db::models::{interaction::Interaction, task::TaskStatus};

    use super::*;
    use crate::services::test_utils::setup_test_pool;

    /// Keyword-tier-only dispatcher: an empty provider chain exercises
    /// the deterministic fallback path end-to-end.
    fn offline_dispatcher(pool: SqlitePool) -> Dispatcher {
        let config = AgentConfig {
            provider_order: vec![],
            ..AgentConfig::default()
        };
        Dispatcher::new(pool, &config)
    }

    #[tokio::test]
    async fn buy_milk_creates_a_persisted_task() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool.clone());

        let outcome = dispatcher.dispatch("U1", "buy milk", false).await;
        assert_eq!(outcome.action, Action::Create);
        assert_eq!(outcome.result["task"], "Milk");
        assert!(outcome.message.contains("Milk"));

        let tasks = Task::find_by_user(&pool, "U1").await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Milk");
        assert_eq!(tasks[0].user_id, "U1");
    }

    #[tokio::test]
    async fn list_returns_only_the_callers_tasks() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool.clone());

        dispatcher.dispatch("U1", "buy milk", false).await;
        dispatcher.dispatch("U2", "buy eggs", false).await;

        let outcome = dispatcher.dispatch("U1", "list my tasks", false).await;
        assert_eq!(outcome.action, Action::List);
        let tasks = outcome.result["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["title"], "Milk");
    }

    #[tokio::test]
    async fn vague_add_routes_to_missing_details() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool.clone());

        let outcome = dispatcher.dispatch("U1", "add task", false).await;
        assert_eq!(outcome.action, Action::ClarifyAddTask);

        let tasks = Task::find_by_user(&pool, "U1").await.unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn completing_a_recurring_task_respawns_it() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool.clone());

        dispatcher.dispatch("U1", "add water plants weekly", false).await;
        let outcome = dispatcher.dispatch("U1", "done water plants", false).await;

        assert_eq!(outcome.action, Action::Update);
        assert_eq!(outcome.result["already_completed"], false);
        assert!(outcome.result["respawned"].is_object());

        let tasks = Task::find_by_user(&pool, "U1").await.unwrap();
        assert_eq!(tasks.len(), 2);
        let pending: Vec<_> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn completing_an_unknown_task_reports_not_found() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool);

        let outcome = dispatcher.dispatch("U1", "done laundry", false).await;
        assert_eq!(outcome.action, Action::Update);
        assert_eq!(outcome.result["error"], "not_found");
        assert!(outcome.message.contains("Laundry"));
    }

    #[tokio::test]
    async fn greeting_reads_the_open_task_count() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool);

        dispatcher.dispatch("U1", "buy milk", false).await;
        let outcome = dispatcher.dispatch("U1", "hello", false).await;

        assert_eq!(outcome.action, Action::Greeting);
        assert_eq!(outcome.result["pending"], 1);
    }

    #[tokio::test]
    async fn unrecognized_input_clarifies() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool);

        let outcome = dispatcher.dispatch("U1", "zzz qqq", false).await;
        assert_eq!(outcome.action, Action::Clarify);
        assert!(outcome.message.contains("zzz qqq"));
    }

    #[tokio::test]
    async fn urdu_without_providers_degrades_to_urdu_clarify() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool);

        let outcome = dispatcher.dispatch("U1", "دودھ خریدنا ہے", false).await;
        assert_eq!(outcome.action, Action::Clarify);
        // Urdu template selected for the detected language.
        assert!(outcome.message.contains("مدد"));
    }

    #[tokio::test]
    async fn every_dispatch_is_audited() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool.clone());

        dispatcher.dispatch("U1", "buy milk", false).await;
        dispatcher.dispatch("U1", "list my tasks", false).await;

        let records = Interaction::find_recent_by_user(&pool, "U1", 20).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "list");
        assert_eq!(records[1].action, "create");
        assert_eq!(records[1].utterance, "buy milk");
    }

    #[tokio::test]
    async fn voice_flag_is_echoed_in_the_result() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool);

        let outcome = dispatcher.dispatch("U1", "buy milk", true).await;
        assert_eq!(outcome.result["voice"], true);
    }

    #[tokio::test]
    async fn timer_stop_without_start_is_reported_not_crashed() {
        let pool = setup_test_pool().await;
        let dispatcher = offline_dispatcher(pool.clone());

        dispatcher.dispatch("U1", "buy milk", false).await;
        let task = &Task::find_by_user(&pool, "U1").await.unwrap()[0];

        let outcome = dispatcher
            .route(
                "U1",
                Intent::ManageTimer,
                &Slots {
                    item: Some(task.title.clone()),
                    timer_action: Some(TimerAction::Stop),
                    ..Slots::default()
                },
                &Detection {
                    normalized_text: "stop timer".to_string(),
                    detected_lang: Lang::En,
                    confidence: 1.0,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.action, Action::Timer);
        assert_eq!(outcome.result["error"], "timer_not_running");
    }
}
