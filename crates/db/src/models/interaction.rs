use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Append-only audit record of one dispatch outcome.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: String,
    pub utterance: String,
    pub action: String,
    pub agent_response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInteraction {
    pub user_id: String,
    pub utterance: String,
    pub action: String,
    pub agent_response: String,
}

impl Interaction {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateInteraction,
    ) -> Result<Self, InteractionError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let record = sqlx::query_as::<_, Interaction>(
            "INSERT INTO interactions (id, user_id, utterance, action, agent_response, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, user_id, utterance, action, agent_response, created_at",
        )
        .bind(id)
        .bind(&data.user_id)
        .bind(&data.utterance)
        .bind(&data.action)
        .bind(&data.agent_response)
        .bind(now)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    /// Newest-first, bounded history for one user.
    pub async fn find_recent_by_user(
        pool: &SqlitePool,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Self>, InteractionError> {
        let records = sqlx::query_as::<_, Interaction>(
            "SELECT id, user_id, utterance, action, agent_response, created_at \
             FROM interactions WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::setup_test_pool;

    fn record(user_id: &str, utterance: &str, action: &str) -> CreateInteraction {
        CreateInteraction {
            user_id: user_id.to_string(),
            utterance: utterance.to_string(),
            action: action.to_string(),
            agent_response: "ok".to_string(),
        }
    }

    #[tokio::test]
    async fn history_is_newest_first_and_bounded() {
        let pool = setup_test_pool().await;

        for i in 0..5 {
            Interaction::create(&pool, &record("u", &format!("utterance {i}"), "create"))
                .await
                .expect("create");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let recent = Interaction::find_recent_by_user(&pool, "u", 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].utterance, "utterance 4");
        assert_eq!(recent[2].utterance, "utterance 2");
    }

    #[tokio::test]
    async fn history_is_scoped_to_user() {
        let pool = setup_test_pool().await;
        Interaction::create(&pool, &record("a", "hello", "greeting"))
            .await
            .unwrap();

        let other = Interaction::find_recent_by_user(&pool, "b", 20).await.unwrap();
        assert!(other.is_empty());
    }
}
