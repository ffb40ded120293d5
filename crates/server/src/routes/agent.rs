use axum::{
    Extension, Json,
    extract::{Query, State},
    response::Json as ResponseJson,
};
use db::models::interaction::Interaction;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use services::services::{dispatcher::DispatchOutcome, tools};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, middleware::AuthUser};

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub utterance: String,
    pub lang: Option<String>,
    #[serde(default)]
    pub voice: bool,
}

pub async fn dispatch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<DispatchRequest>,
) -> Result<ResponseJson<ApiResponse<DispatchOutcome>>, ApiError> {
    if payload.utterance.trim().is_empty() {
        return Err(ApiError::BadRequest("utterance must not be empty".to_string()));
    }

    tracing::debug!(user_id = %user.user_id, "dispatching agent request");
    let outcome = state
        .dispatcher
        .dispatch(&user.user_id, &payload.utterance, payload.voice)
        .await;

    Ok(ResponseJson(ApiResponse::success(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub name: String,
    pub result: Value,
    pub message: String,
}

/// Direct tool invocation for structured UI actions. The caller identity
/// is forced from the verified token; a client-supplied `user_id`
/// argument is overwritten, never trusted.
pub async fn invoke_tool(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ToolInvocation>,
) -> Result<ResponseJson<ApiResponse<ToolResponse>>, ApiError> {
    let mut arguments = if payload.arguments.is_object() {
        payload.arguments
    } else {
        json!({})
    };
    if let Some(map) = arguments.as_object_mut() {
        map.insert("user_id".to_string(), json!(user.user_id));
    }

    let outcome = tools::invoke(&state.db.pool, &user.user_id, &payload.name, arguments).await?;

    Ok(ResponseJson(ApiResponse::success(ToolResponse {
        name: payload.name,
        result: outcome.result,
        message: outcome.message,
    })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// The caller's interaction records, newest first, bounded by the
/// configured limit.
pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Interaction>>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.config.history_limit)
        .clamp(1, state.config.history_limit);

    let records = Interaction::find_recent_by_user(&state.db.pool, &user.user_id, limit).await?;
    Ok(ResponseJson(ApiResponse::success(records)))
}
