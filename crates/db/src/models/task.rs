use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Task not found")]
    NotFound,
    #[error("Timer not running")]
    TimerNotRunning,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(type_name = "priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Urgent,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskPriority::Urgent => "urgent",
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "urgent" => Ok(TaskPriority::Urgent),
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(type_name = "recurrence", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            _ => Err(format!("Unknown recurrence: {}", s)),
        }
    }
}

/// A persisted task row. `user_id` is set at creation and never mutated;
/// every query below carries the owner filter in SQL.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub recurrence: Recurrence,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>, // JSON array of strings
    pub timer_started_at: Option<DateTime<Utc>>,
    pub total_time_spent: i64, // accumulated seconds
    pub last_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub user_id: String,
    pub title: String,
    pub priority: Option<TaskPriority>,
    pub recurrence: Option<Recurrence>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

/// Result of a strict `complete` call. Recurrence respawning must only
/// fire on `Completed` — an `AlreadyCompleted` retry never spawns twice.
#[derive(Debug, Clone)]
pub enum CompleteOutcome {
    Completed(Task),
    AlreadyCompleted(Task),
}

impl CompleteOutcome {
    pub fn task(&self) -> &Task {
        match self {
            CompleteOutcome::Completed(task) => task,
            CompleteOutcome::AlreadyCompleted(task) => task,
        }
    }
}

const TASK_COLUMNS: &str = "id, user_id, title, status, priority, recurrence, due_date, tags, \
     timer_started_at, total_time_spent, last_completed_at, created_at";

impl Task {
    fn serialize_json_array(arr: &Option<Vec<String>>) -> Option<String> {
        arr.as_ref()
            .map(|v| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()))
    }

    pub fn tags_vec(&self) -> Vec<String> {
        self.tags
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    pub async fn create(pool: &SqlitePool, data: &CreateTask) -> Result<Self, TaskError> {
        let id = Uuid::new_v4();
        let priority = data.priority.unwrap_or(TaskPriority::Medium);
        let recurrence = data.recurrence.unwrap_or(Recurrence::None);
        let tags_json = Self::serialize_json_array(&data.tags);
        let now = Utc::now();

        let query = format!(
            "INSERT INTO tasks (id, user_id, title, status, priority, recurrence, due_date, tags, \
             total_time_spent, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9) \
             RETURNING {TASK_COLUMNS}"
        );
        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(&data.user_id)
            .bind(&data.title)
            .bind(TaskStatus::Pending)
            .bind(priority)
            .bind(recurrence)
            .bind(data.due_date)
            .bind(tags_json)
            .bind(now)
            .fetch_one(pool)
            .await?;
        Ok(task)
    }

    /// All tasks owned by `user_id`, most-recent-first.
    pub async fn find_by_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Self>, TaskError> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Ok(tasks)
    }

    pub async fn find_by_id_and_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Self>, TaskError> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");
        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(task)
    }

    /// Resolve a user-supplied reference: a task id when it parses as one,
    /// otherwise a case-insensitive title match (exact first, then
    /// substring), most recent match winning.
    pub async fn find_by_reference(
        pool: &SqlitePool,
        user_id: &str,
        reference: &str,
    ) -> Result<Option<Self>, TaskError> {
        if let Ok(id) = Uuid::parse_str(reference.trim()) {
            return Self::find_by_id_and_user(pool, id, user_id).await;
        }

        let needle = reference.trim().to_lowercase();
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE user_id = $1 AND LOWER(title) = $2 \
             ORDER BY created_at DESC LIMIT 1"
        );
        if let Some(task) = sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .bind(&needle)
            .fetch_optional(pool)
            .await?
        {
            return Ok(Some(task));
        }

        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE user_id = $1 AND LOWER(title) LIKE $2 \
             ORDER BY created_at DESC LIMIT 1"
        );
        let task = sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .bind(format!("%{}%", needle))
            .fetch_optional(pool)
            .await?;
        Ok(task)
    }

    /// Strict-complete: a pending task transitions to completed; an
    /// already-completed task is reported back untouched. The status guard
    /// in the WHERE clause is what detects the transition, so concurrent
    /// or retried completes resolve to exactly one `Completed`.
    pub async fn complete(
        pool: &SqlitePool,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CompleteOutcome, TaskError> {
        let result = sqlx::query(
            "UPDATE tasks SET status = 'completed', last_completed_at = $3 \
             WHERE id = $1 AND user_id = $2 AND status = 'pending'",
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;

        let task = Self::find_by_id_and_user(pool, id, user_id)
            .await?
            .ok_or(TaskError::NotFound)?;

        if result.rows_affected() == 0 {
            Ok(CompleteOutcome::AlreadyCompleted(task))
        } else {
            Ok(CompleteOutcome::Completed(task))
        }
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid, user_id: &str) -> Result<u64, TaskError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Start the task timer. A prior unstopped timer is overwritten — no
    /// stacking.
    pub async fn start_timer(
        pool: &SqlitePool,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        let result = sqlx::query(
            "UPDATE tasks SET timer_started_at = $3 WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound);
        }
        Self::find_by_id_and_user(pool, id, user_id)
            .await?
            .ok_or(TaskError::NotFound)
    }

    /// Stop the task timer, folding the elapsed whole seconds into
    /// `total_time_spent`.
    pub async fn stop_timer(
        pool: &SqlitePool,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        let task = Self::find_by_id_and_user(pool, id, user_id)
            .await?
            .ok_or(TaskError::NotFound)?;
        let started_at = task.timer_started_at.ok_or(TaskError::TimerNotRunning)?;

        let elapsed = (now - started_at).num_seconds().max(0);
        sqlx::query(
            "UPDATE tasks SET total_time_spent = total_time_spent + $3, timer_started_at = NULL \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(elapsed)
        .execute(pool)
        .await?;

        Self::find_by_id_and_user(pool, id, user_id)
            .await?
            .ok_or(TaskError::NotFound)
    }
}
