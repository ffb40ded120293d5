//! Audit trail of dispatch outcomes. A failed write must never abort the
//! response; it is reported to operator-facing output only.

use db::models::interaction::{CreateInteraction, Interaction};
use sqlx::SqlitePool;

pub async fn record(pool: &SqlitePool, user_id: &str, utterance: &str, action: &str, response: &str) {
    let data = CreateInteraction {
        user_id: user_id.to_string(),
        utterance: utterance.to_string(),
        action: action.to_string(),
        agent_response: response.to_string(),
    };
    if let Err(e) = Interaction::create(pool, &data).await {
        tracing::warn!("failed to record interaction: {}", e);
    }
}
