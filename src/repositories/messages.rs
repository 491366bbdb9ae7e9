use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Message;
use crate::db::types::UserRole;

const COLUMNS: &str =
    "id, sender_id, recipient_id, sender_role, course_id, body, created_at, delivered_at, read_at";

pub(crate) struct CreateMessage<'a> {
    pub(crate) id: &'a str,
    pub(crate) sender_id: &'a str,
    pub(crate) recipient_id: &'a str,
    pub(crate) sender_role: UserRole,
    pub(crate) course_id: Option<&'a str>,
    pub(crate) body: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Student-initiated usage inside the rolling window: message count and the oldest timestamp.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct WindowUsage {
    pub(crate) used: i64,
    pub(crate) oldest: Option<PrimitiveDateTime>,
}

pub(crate) async fn window_usage(
    executor: impl PgExecutor<'_>,
    student_id: &str,
    teacher_id: &str,
    since: PrimitiveDateTime,
) -> Result<WindowUsage, sqlx::Error> {
    sqlx::query_as::<_, WindowUsage>(
        "SELECT COUNT(*) AS used, MIN(created_at) AS oldest
         FROM messages
         WHERE sender_id = $1
           AND recipient_id = $2
           AND sender_role = $3
           AND created_at >= $4",
    )
    .bind(student_id)
    .bind(teacher_id)
    .bind(UserRole::Student)
    .bind(since)
    .fetch_one(executor)
    .await
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateMessage<'_>,
) -> Result<Message, sqlx::Error> {
    sqlx::query_as::<_, Message>(&format!(
        "INSERT INTO messages (id, sender_id, recipient_id, sender_role, course_id, body, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.sender_id)
    .bind(params.recipient_id)
    .bind(params.sender_role)
    .bind(params.course_id)
    .bind(params.body)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>(&format!("SELECT {COLUMNS} FROM messages WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Both directions between two users, newest first.
pub(crate) async fn list_conversation(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    other_user_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>(&format!(
        "SELECT {COLUMNS}
         FROM messages
         WHERE (sender_id = $1 AND recipient_id = $2)
            OR (sender_id = $2 AND recipient_id = $1)
         ORDER BY created_at DESC, id
         OFFSET $3
         LIMIT $4"
    ))
    .bind(user_id)
    .bind(other_user_id)
    .bind(skip.max(0))
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_conversation(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    other_user_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*)
         FROM messages
         WHERE (sender_id = $1 AND recipient_id = $2)
            OR (sender_id = $2 AND recipient_id = $1)",
    )
    .bind(user_id)
    .bind(other_user_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn mark_delivered(
    executor: impl PgExecutor<'_>,
    recipient_id: &str,
    sender_id: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE messages
         SET delivered_at = $1
         WHERE recipient_id = $2
           AND sender_id = $3
           AND delivered_at IS NULL",
    )
    .bind(now)
    .bind(recipient_id)
    .bind(sender_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn mark_read(
    executor: impl PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Message, sqlx::Error> {
    sqlx::query_as::<_, Message>(&format!(
        "UPDATE messages
         SET read_at = COALESCE(read_at, $1),
             delivered_at = COALESCE(delivered_at, $1)
         WHERE id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}
