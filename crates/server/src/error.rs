use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::{interaction::InteractionError, task::TaskError};
use services::services::tools::ToolError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Interaction(#[from] InteractionError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Task(err) => match err {
                TaskError::NotFound => (StatusCode::NOT_FOUND, "TaskNotFound"),
                TaskError::TimerNotRunning => (StatusCode::BAD_REQUEST, "TimerNotRunning"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::Interaction(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InteractionError"),
            ApiError::Tool(err) => match err {
                ToolError::UnknownTool(_) => (StatusCode::BAD_REQUEST, "UnknownTool"),
                ToolError::BadArguments(_) => (StatusCode::BAD_REQUEST, "BadArguments"),
                ToolError::Task(TaskError::NotFound) => (StatusCode::NOT_FOUND, "TaskNotFound"),
                ToolError::Task(TaskError::TimerNotRunning) => {
                    (StatusCode::BAD_REQUEST, "TimerNotRunning")
                }
                ToolError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::InternalError(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
