use axum::{
    Router,
    response::Json as ResponseJson,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use utils::response::ApiResponse;

use crate::{AppState, middleware::require_auth};

pub mod agent;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/api/agent/dispatch", post(agent::dispatch))
        .route("/api/agent/tools", post(agent::invoke_tool))
        .route("/api/agent/history", get(agent::history))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(protected)
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

async fn health() -> ResponseJson<ApiResponse<&'static str>> {
    ResponseJson(ApiResponse::success("ok"))
}
