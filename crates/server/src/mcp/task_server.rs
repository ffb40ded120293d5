//! MCP stdio server exposing the task tools to structured clients. The
//! serving identity is fixed at process start — tool arguments never
//! carry a user id.

use rmcp::{
    ErrorData, ServerHandler,
    handler::server::tool::{Parameters, ToolRouter},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use serde_json::json;
use services::services::tools;
use sqlx::SqlitePool;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddTodoRequest {
    #[schemars(description = "Title of the task to add")]
    pub title: String,

    #[schemars(description = "Priority: urgent, high, medium or low")]
    pub priority: Option<String>,

    #[schemars(description = "Recurrence: none, daily, weekly or monthly")]
    pub recurrence: Option<String>,

    #[schemars(description = "Due date as an RFC 3339 timestamp")]
    pub due_date: Option<String>,

    #[schemars(description = "Tags to attach to the task")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddTodosBulkRequest {
    #[schemars(description = "Titles of the tasks to add; blank entries are skipped")]
    pub titles: Vec<String>,

    #[schemars(description = "Priority applied to every task")]
    pub priority: Option<String>,

    #[schemars(description = "Recurrence applied to every task")]
    pub recurrence: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TaskRefRequest {
    #[schemars(description = "Task id, or a title to match")]
    pub task_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ManageTimerRequest {
    #[schemars(description = "Task id, or a title to match")]
    pub task_id: String,

    #[schemars(description = "Timer action: start or stop")]
    pub action: String,
}

#[derive(Clone)]
pub struct TaskServer {
    pool: SqlitePool,
    user_id: String,
    tool_router: ToolRouter<TaskServer>,
}

impl TaskServer {
    pub fn new(pool: SqlitePool, user_id: String) -> Self {
        Self {
            pool,
            user_id,
            tool_router: Self::tool_router(),
        }
    }

    async fn run_tool(&self, name: &str, arguments: serde_json::Value) -> Result<CallToolResult, ErrorData> {
        match tools::invoke(&self.pool, &self.user_id, name, arguments).await {
            Ok(outcome) => Ok(CallToolResult::success(vec![Content::text(outcome.message)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

#[tool_router]
impl TaskServer {
    #[tool(description = "Add a new todo task.")]
    async fn add_todo(
        &self,
        Parameters(AddTodoRequest {
            title,
            priority,
            recurrence,
            due_date,
            tags,
        }): Parameters<AddTodoRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run_tool(
            "add_todo",
            json!({
                "title": title,
                "priority": priority,
                "recurrence": recurrence,
                "due_date": due_date,
                "tags": tags,
            }),
        )
        .await
    }

    #[tool(description = "Add multiple todo tasks at once.")]
    async fn add_todos_bulk(
        &self,
        Parameters(AddTodosBulkRequest {
            titles,
            priority,
            recurrence,
        }): Parameters<AddTodosBulkRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run_tool(
            "add_todos_bulk",
            json!({
                "titles": titles,
                "priority": priority,
                "recurrence": recurrence,
            }),
        )
        .await
    }

    #[tool(description = "Retrieve all todo tasks.")]
    async fn list_todos(&self) -> Result<CallToolResult, ErrorData> {
        self.run_tool("list_todos", json!({})).await
    }

    #[tool(
        description = "Mark a todo task as completed. A recurring task respawns a fresh pending instance."
    )]
    async fn complete_todo(
        &self,
        Parameters(TaskRefRequest { task_id }): Parameters<TaskRefRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run_tool("complete_todo", json!({ "task_id": task_id })).await
    }

    #[tool(description = "Delete a todo task.")]
    async fn delete_todo(
        &self,
        Parameters(TaskRefRequest { task_id }): Parameters<TaskRefRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run_tool("delete_todo", json!({ "task_id": task_id })).await
    }

    #[tool(description = "Start or stop the mission clock for a task.")]
    async fn manage_timer(
        &self,
        Parameters(ManageTimerRequest { task_id, action }): Parameters<ManageTimerRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run_tool(
            "manage_timer",
            json!({ "task_id": task_id, "action": action }),
        )
        .await
    }
}

#[tool_handler]
impl ServerHandler for TaskServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "todo-agent-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Task-management tools for the todo agent. Available tools: 'add_todo', \
                 'add_todos_bulk', 'list_todos', 'complete_todo', 'delete_todo' and \
                 'manage_timer'. Completing a recurring task respawns a fresh pending \
                 instance at the next occurrence."
                    .to_string(),
            ),
        }
    }
}
