use chrono::{DateTime, Utc};
use db::models::task::{Recurrence, TaskPriority};
use serde::{Deserialize, Serialize};

/// Closed set of things the user can ask for. Routing in the dispatcher
/// matches exhaustively over this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AddTask,
    ListTasks,
    CompleteTask,
    DeleteTask,
    ManageTimer,
    Greeting,
    Clarify,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Intent::AddTask => "add_task",
            Intent::ListTasks => "list_tasks",
            Intent::CompleteTask => "complete_task",
            Intent::DeleteTask => "delete_task",
            Intent::ManageTimer => "manage_timer",
            Intent::Greeting => "greeting",
            Intent::Clarify => "clarify",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add_task" => Ok(Intent::AddTask),
            "list_tasks" => Ok(Intent::ListTasks),
            "complete_task" => Ok(Intent::CompleteTask),
            "delete_task" => Ok(Intent::DeleteTask),
            "manage_timer" => Ok(Intent::ManageTimer),
            "greeting" => Ok(Intent::Greeting),
            "clarify" => Ok(Intent::Clarify),
            _ => Err(format!("Unknown intent: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerAction {
    Start,
    Stop,
}

impl std::fmt::Display for TimerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerAction::Start => write!(f, "start"),
            TimerAction::Stop => write!(f, "stop"),
        }
    }
}

impl std::str::FromStr for TimerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(TimerAction::Start),
            "stop" => Ok(TimerAction::Stop),
            _ => Err(format!("Unknown timer action: {}", s)),
        }
    }
}

/// Structured values extracted from one utterance. Unset slots carry the
/// documented defaults (priority medium, recurrence none).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slots {
    pub item: Option<String>,
    pub priority: TaskPriority,
    pub recurrence: Recurrence,
    pub due_date: Option<DateTime<Utc>>,
    pub timer_action: Option<TimerAction>,
}

impl Default for Slots {
    fn default() -> Self {
        Self {
            item: None,
            priority: TaskPriority::Medium,
            recurrence: Recurrence::None,
            due_date: None,
            timer_action: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: Intent,
    pub slots: Slots,
}

impl ClassificationResult {
    pub fn bare(intent: Intent) -> Self {
        Self {
            intent,
            slots: Slots::default(),
        }
    }
}
