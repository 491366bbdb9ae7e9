use sqlx::PgExecutor;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

use super::types::COLUMNS;

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the submission for the rest of the transaction.
pub(crate) async fn find_for_update(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_pending(
    executor: impl PgExecutor<'_>,
    assessment_id: &str,
    student_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE assessment_id = $1
           AND student_id = $2
           AND status = $3"
    ))
    .bind(assessment_id)
    .bind(student_id)
    .bind(SubmissionStatus::Pending)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_attempts(
    executor: impl PgExecutor<'_>,
    assessment_id: &str,
    student_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM submissions WHERE assessment_id = $1 AND student_id = $2",
    )
    .bind(assessment_id)
    .bind(student_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_student_assessment(
    executor: impl PgExecutor<'_>,
    assessment_id: &str,
    student_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE assessment_id = $1 AND student_id = $2
         ORDER BY attempt_number"
    ))
    .bind(assessment_id)
    .bind(student_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn exists_for_assessment(
    executor: impl PgExecutor<'_>,
    assessment_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM submissions WHERE assessment_id = $1)",
    )
    .bind(assessment_id)
    .fetch_one(executor)
    .await
}
