//! Mission respawn: completing a recurring task spawns its successor.
//!
//! `next_due` is a pure function of the recurrence rule and the current
//! instant; spawning happens at most once per completion because it is
//! keyed off the store's pending→completed transition report.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use db::models::task::{CompleteOutcome, CreateTask, Recurrence, Task, TaskError};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CompletionReport {
    pub task: Task,
    pub respawned: Option<Task>,
    pub already_completed: bool,
}

pub fn next_due(recurrence: Recurrence, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match recurrence {
        Recurrence::None => None,
        Recurrence::Daily => Some(now + Duration::days(1)),
        Recurrence::Weekly => Some(now + Duration::days(7)),
        Recurrence::Monthly => Some(add_one_month(now)),
    }
}

/// Advance the month by one, wrapping December into January of the next
/// year. Day-of-month is clamped to the last valid day of the target
/// month (Jan 31 → Feb 28/29).
fn add_one_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let (mut year, mut month) = (now.year(), now.month());
    if month == 12 {
        year += 1;
        month = 1;
    } else {
        month += 1;
    }
    let day = now.day().min(days_in_month(year, month));

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(now.hour(), now.minute(), now.second()))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or_else(|| now + Duration::days(30))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
    }
}

/// Successor payload for a completed recurring task: same title,
/// priority, recurrence and tags, fresh id, pending, due at the next
/// occurrence.
pub fn respawn(task: &Task, now: DateTime<Utc>) -> Option<CreateTask> {
    let due = next_due(task.recurrence, now)?;
    Some(CreateTask {
        user_id: task.user_id.clone(),
        title: task.title.clone(),
        priority: Some(task.priority),
        recurrence: Some(task.recurrence),
        due_date: Some(due),
        tags: Some(task.tags_vec()),
    })
}

/// Strict-complete plus the respawn trigger. Only a genuine
/// pending→completed transition spawns a successor, so retried or
/// concurrent completes produce at most one.
pub async fn complete_with_respawn(
    pool: &SqlitePool,
    id: Uuid,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<CompletionReport, TaskError> {
    match Task::complete(pool, id, user_id, now).await? {
        CompleteOutcome::Completed(task) => {
            let respawned = match respawn(&task, now) {
                Some(payload) => Some(Task::create(pool, &payload).await?),
                None => None,
            };
            Ok(CompletionReport {
                task,
                respawned,
                already_completed: false,
            })
        }
        CompleteOutcome::AlreadyCompleted(task) => Ok(CompletionReport {
            task,
            respawned: None,
            already_completed: true,
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use db::models::task::{TaskPriority, TaskStatus};

    use super::*;
    use crate::services::test_utils::setup_test_pool;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn daily_and_weekly_add_fixed_offsets() {
        let now = utc(2024, 3, 10, 9, 30, 0);
        assert_eq!(next_due(Recurrence::Daily, now), Some(now + Duration::days(1)));
        assert_eq!(next_due(Recurrence::Weekly, now), Some(now + Duration::days(7)));
        assert_eq!(next_due(Recurrence::None, now), None);
    }

    #[test]
    fn monthly_advances_one_month() {
        let now = utc(2024, 3, 15, 9, 30, 0);
        assert_eq!(
            next_due(Recurrence::Monthly, now),
            Some(utc(2024, 4, 15, 9, 30, 0))
        );
    }

    #[test]
    fn monthly_clamps_day_of_month_overflow() {
        // Jan 31 in a leap year lands on Feb 29.
        assert_eq!(
            next_due(Recurrence::Monthly, utc(2024, 1, 31, 8, 0, 0)),
            Some(utc(2024, 2, 29, 8, 0, 0))
        );
        // Non-leap year clamps to Feb 28.
        assert_eq!(
            next_due(Recurrence::Monthly, utc(2025, 1, 31, 8, 0, 0)),
            Some(utc(2025, 2, 28, 8, 0, 0))
        );
        // May 31 → Jun 30.
        assert_eq!(
            next_due(Recurrence::Monthly, utc(2024, 5, 31, 8, 0, 0)),
            Some(utc(2024, 6, 30, 8, 0, 0))
        );
    }

    #[test]
    fn monthly_wraps_december_into_january() {
        assert_eq!(
            next_due(Recurrence::Monthly, utc(2024, 12, 31, 23, 59, 59)),
            Some(utc(2025, 1, 31, 23, 59, 59))
        );
    }

    #[tokio::test]
    async fn completing_weekly_task_spawns_one_pending_successor() {
        let pool = setup_test_pool().await;
        let task = Task::create(
            &pool,
            &CreateTask {
                user_id: "u".to_string(),
                title: "Water plants".to_string(),
                priority: Some(TaskPriority::High),
                recurrence: Some(Recurrence::Weekly),
                due_date: None,
                tags: Some(vec!["garden".to_string()]),
            },
        )
        .await
        .unwrap();

        let now = Utc::now();
        let report = complete_with_respawn(&pool, task.id, "u", now).await.unwrap();

        assert!(!report.already_completed);
        assert_eq!(report.task.id, task.id);
        assert_eq!(report.task.status, TaskStatus::Completed);

        let successor = report.respawned.expect("successor");
        assert_ne!(successor.id, task.id);
        assert_eq!(successor.title, "Water plants");
        assert_eq!(successor.priority, TaskPriority::High);
        assert_eq!(successor.recurrence, Recurrence::Weekly);
        assert_eq!(successor.status, TaskStatus::Pending);
        assert_eq!(successor.tags_vec(), vec!["garden".to_string()]);

        let due = successor.due_date.expect("due date");
        let expected = now + Duration::days(7);
        assert!((due - expected).num_seconds().abs() < 5);

        let all = Task::find_by_user(&pool, "u").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn retried_complete_spawns_at_most_once() {
        let pool = setup_test_pool().await;
        let task = Task::create(
            &pool,
            &CreateTask {
                user_id: "u".to_string(),
                title: "Standup".to_string(),
                priority: None,
                recurrence: Some(Recurrence::Daily),
                due_date: None,
                tags: None,
            },
        )
        .await
        .unwrap();

        let now = Utc::now();
        let first = complete_with_respawn(&pool, task.id, "u", now).await.unwrap();
        assert!(first.respawned.is_some());

        let second = complete_with_respawn(&pool, task.id, "u", now).await.unwrap();
        assert!(second.already_completed);
        assert!(second.respawned.is_none());

        let all = Task::find_by_user(&pool, "u").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn non_recurring_complete_spawns_nothing() {
        let pool = setup_test_pool().await;
        let task = Task::create(
            &pool,
            &CreateTask {
                user_id: "u".to_string(),
                title: "One off".to_string(),
                priority: None,
                recurrence: None,
                due_date: None,
                tags: None,
            },
        )
        .await
        .unwrap();

        let report = complete_with_respawn(&pool, task.id, "u", Utc::now()).await.unwrap();
        assert!(report.respawned.is_none());
        assert_eq!(Task::find_by_user(&pool, "u").await.unwrap().len(), 1);
    }
}
