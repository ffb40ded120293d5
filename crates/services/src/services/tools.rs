//! Direct tool invocation, bypassing classification. Used by structured
//! UI actions over HTTP and by the MCP server. The caller identity is
//! supplied by the surrounding layer — never read from the arguments.

use agent::{intent::TimerAction, language::Lang};
use chrono::{DateTime, Utc};
use db::models::task::{CreateTask, Recurrence, Task, TaskError, TaskPriority};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::services::{recurrence, templates};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments: {0}")]
    BadArguments(String),
    #[error(transparent)]
    Task(#[from] TaskError),
}

#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub result: Value,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct AddTodoArgs {
    title: String,
    priority: Option<TaskPriority>,
    recurrence: Option<Recurrence>,
    due_date: Option<DateTime<Utc>>,
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct AddTodosBulkArgs {
    titles: Vec<String>,
    priority: Option<TaskPriority>,
    recurrence: Option<Recurrence>,
}

#[derive(Debug, Deserialize)]
struct TaskRefArgs {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct ManageTimerArgs {
    task_id: String,
    action: TimerAction,
}

pub async fn invoke(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    arguments: Value,
) -> Result<ToolOutcome, ToolError> {
    match name {
        "add_todo" => add_todo(pool, user_id, parse(arguments)?).await,
        "add_todos_bulk" => add_todos_bulk(pool, user_id, parse(arguments)?).await,
        "list_todos" => list_todos(pool, user_id).await,
        "complete_todo" => complete_todo(pool, user_id, parse(arguments)?).await,
        "delete_todo" => delete_todo(pool, user_id, parse(arguments)?).await,
        "manage_timer" => manage_timer(pool, user_id, parse(arguments)?).await,
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn parse<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::BadArguments(e.to_string()))
}

async fn add_todo(
    pool: &SqlitePool,
    user_id: &str,
    args: AddTodoArgs,
) -> Result<ToolOutcome, ToolError> {
    let task = Task::create(
        pool,
        &CreateTask {
            user_id: user_id.to_string(),
            title: args.title,
            priority: args.priority,
            recurrence: args.recurrence,
            due_date: args.due_date,
            tags: args.tags,
        },
    )
    .await?;

    let mut message = format!("Objective '{}' deployed.", task.title);
    if let Some(due) = task.due_date {
        message.push_str(&format!(" Due at: {}.", due.format("%Y-%m-%d %H:%M")));
    }
    Ok(ToolOutcome {
        result: json!({ "task": task }),
        message,
    })
}

async fn add_todos_bulk(
    pool: &SqlitePool,
    user_id: &str,
    args: AddTodosBulkArgs,
) -> Result<ToolOutcome, ToolError> {
    let titles: Vec<&str> = args
        .titles
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    if titles.is_empty() {
        return Ok(ToolOutcome {
            result: json!({ "created": 0 }),
            message: "No objectives found in the list.".to_string(),
        });
    }

    let mut created = Vec::with_capacity(titles.len());
    for title in titles {
        let task = Task::create(
            pool,
            &CreateTask {
                user_id: user_id.to_string(),
                title: title.to_string(),
                priority: args.priority,
                recurrence: args.recurrence,
                due_date: None,
                tags: None,
            },
        )
        .await?;
        created.push(task);
    }

    let message = format!(
        "Bulk Deployment Complete: {} objectives synchronized.",
        created.len()
    );
    Ok(ToolOutcome {
        result: json!({ "created": created.len(), "tasks": created }),
        message,
    })
}

async fn list_todos(pool: &SqlitePool, user_id: &str) -> Result<ToolOutcome, ToolError> {
    let tasks = Task::find_by_user(pool, user_id).await?;
    let message = templates::listed(Lang::En, tasks.len());
    Ok(ToolOutcome {
        result: json!({ "tasks": tasks }),
        message,
    })
}

async fn complete_todo(
    pool: &SqlitePool,
    user_id: &str,
    args: TaskRefArgs,
) -> Result<ToolOutcome, ToolError> {
    let task = Task::find_by_reference(pool, user_id, &args.task_id)
        .await?
        .ok_or(TaskError::NotFound)?;

    let report = recurrence::complete_with_respawn(pool, task.id, user_id, Utc::now()).await?;
    let message = if report.already_completed {
        templates::already_completed(Lang::En, &report.task.title)
    } else {
        templates::completed(
            Lang::En,
            &report.task.title,
            report.respawned.as_ref().and_then(|t| t.due_date),
        )
    };
    Ok(ToolOutcome {
        result: json!({
            "task": report.task,
            "respawned": report.respawned,
            "already_completed": report.already_completed,
        }),
        message,
    })
}

async fn delete_todo(
    pool: &SqlitePool,
    user_id: &str,
    args: TaskRefArgs,
) -> Result<ToolOutcome, ToolError> {
    let task = Task::find_by_reference(pool, user_id, &args.task_id)
        .await?
        .ok_or(TaskError::NotFound)?;

    let deleted = Task::delete(pool, task.id, user_id).await?;
    if deleted == 0 {
        return Err(TaskError::NotFound.into());
    }
    let message = templates::deleted(Lang::En, &task.title);
    Ok(ToolOutcome {
        result: json!({ "deleted": task.id, "task": task.title }),
        message,
    })
}

async fn manage_timer(
    pool: &SqlitePool,
    user_id: &str,
    args: ManageTimerArgs,
) -> Result<ToolOutcome, ToolError> {
    let task = Task::find_by_reference(pool, user_id, &args.task_id)
        .await?
        .ok_or(TaskError::NotFound)?;

    match args.action {
        TimerAction::Start => {
            let task = Task::start_timer(pool, task.id, user_id, Utc::now()).await?;
            Ok(ToolOutcome {
                message: templates::timer_started(Lang::En, &task.title),
                result: json!({ "task": task, "timer": "start" }),
            })
        }
        TimerAction::Stop => {
            let task = Task::stop_timer(pool, task.id, user_id, Utc::now()).await?;
            Ok(ToolOutcome {
                message: templates::timer_stopped(Lang::En, &task.title, task.total_time_spent),
                result: json!({ "task": task, "timer": "stop" }),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::setup_test_pool;

    #[tokio::test]
    async fn add_then_list_round_trips() {
        let pool = setup_test_pool().await;

        let outcome = invoke(
            &pool,
            "u1",
            "add_todo",
            json!({ "title": "Buy milk", "priority": "high" }),
        )
        .await
        .unwrap();
        assert!(outcome.message.contains("Buy milk"));

        let outcome = invoke(&pool, "u1", "list_todos", json!({})).await.unwrap();
        let tasks = outcome.result["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["title"], "Buy milk");
        assert_eq!(tasks[0]["priority"], "high");

        // A different user sees nothing.
        let outcome = invoke(&pool, "u2", "list_todos", json!({})).await.unwrap();
        assert!(outcome.result["tasks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bulk_add_skips_blank_titles() {
        let pool = setup_test_pool().await;

        let outcome = invoke(
            &pool,
            "u",
            "add_todos_bulk",
            json!({ "titles": ["Eggs", "  ", "Bread"] }),
        )
        .await
        .unwrap();
        assert_eq!(outcome.result["created"], 2);

        let outcome = invoke(&pool, "u", "add_todos_bulk", json!({ "titles": ["", " "] }))
            .await
            .unwrap();
        assert_eq!(outcome.result["created"], 0);
        assert!(outcome.message.contains("No objectives"));
    }

    #[tokio::test]
    async fn complete_by_title_reports_respawn() {
        let pool = setup_test_pool().await;
        invoke(
            &pool,
            "u",
            "add_todo",
            json!({ "title": "Standup", "recurrence": "daily" }),
        )
        .await
        .unwrap();

        let outcome = invoke(&pool, "u", "complete_todo", json!({ "task_id": "standup" }))
            .await
            .unwrap();
        assert_eq!(outcome.result["already_completed"], false);
        assert!(outcome.result["respawned"].is_object());
        assert!(outcome.message.contains("respawned"));
    }

    #[tokio::test]
    async fn timer_stop_without_start_is_an_error() {
        let pool = setup_test_pool().await;
        invoke(&pool, "u", "add_todo", json!({ "title": "Focus" }))
            .await
            .unwrap();

        let err = invoke(
            &pool,
            "u",
            "manage_timer",
            json!({ "task_id": "focus", "action": "stop" }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ToolError::Task(TaskError::TimerNotRunning)));
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let pool = setup_test_pool().await;
        let err = invoke(&pool, "u", "drop_tables", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn missing_task_reference_is_not_found() {
        let pool = setup_test_pool().await;
        let err = invoke(&pool, "u", "delete_todo", json!({ "task_id": "ghost" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Task(TaskError::NotFound)));
    }
}
