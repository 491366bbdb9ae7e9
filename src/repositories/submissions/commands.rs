use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

use super::types::{CreatePending, SubmitUpdate, COLUMNS};

/// Inserts a pending attempt unless another pending attempt (or the same attempt number) already
/// exists. Returns `None` when the insert lost that race.
pub(crate) async fn create_pending_if_absent(
    executor: impl PgExecutor<'_>,
    params: CreatePending<'_>,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, assessment_id, student_id, attempt_number, status, started_at, expires_at,
            total_points, created_at, updated_at
         )
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$6,$6)
         ON CONFLICT DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.assessment_id)
    .bind(params.student_id)
    .bind(params.attempt_number)
    .bind(SubmissionStatus::Pending)
    .bind(params.started_at)
    .bind(params.expires_at)
    .bind(params.total_points)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn mark_submitted(
    executor: impl PgExecutor<'_>,
    id: &str,
    update: SubmitUpdate,
) -> Result<Submission, sqlx::Error> {
    let (status, graded_at) = if update.finalized {
        (SubmissionStatus::Graded, Some(update.submitted_at))
    } else {
        (SubmissionStatus::Submitted, None)
    };

    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET status = $1,
             submitted_at = $2,
             graded_at = $3,
             score = $4,
             total_points = $5,
             percentage = $6,
             time_spent_seconds = $7,
             updated_at = $2
         WHERE id = $8
         RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(update.submitted_at)
    .bind(graded_at)
    .bind(update.score)
    .bind(update.total_points)
    .bind(update.percentage)
    .bind(update.time_spent_seconds)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Moves a submitted attempt to graded once manual review has finished.
pub(crate) async fn finalize_grade(
    executor: impl PgExecutor<'_>,
    id: &str,
    score: f64,
    percentage: f64,
    now: PrimitiveDateTime,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET status = $1,
             score = $2,
             percentage = $3,
             graded_at = $4,
             updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(SubmissionStatus::Graded)
    .bind(score)
    .bind(percentage)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}
