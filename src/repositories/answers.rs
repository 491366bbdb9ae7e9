use sqlx::types::Json;
use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Answer;
use crate::db::types::ReviewStatus;

const COLUMNS: &str = "\
    id, submission_id, question_id, selected_options, text_answer, is_correct, points_awarded, \
    review_status, feedback, flag_reason, ai_draft, graded_by, graded_at, created_at, updated_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) submission_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_options: &'a [String],
    pub(crate) text_answer: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

/// Auto-grading outcome for one answer.
pub(crate) struct AnswerResult<'a> {
    pub(crate) answer_id: &'a str,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
    pub(crate) review_status: ReviewStatus,
}

pub(crate) async fn upsert(
    executor: impl PgExecutor<'_>,
    params: UpsertAnswer<'_>,
) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "INSERT INTO answers (
            id, submission_id, question_id, selected_options, text_answer, review_status,
            created_at, updated_at
         )
         VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
         ON CONFLICT (submission_id, question_id) DO UPDATE
         SET selected_options = EXCLUDED.selected_options,
             text_answer = EXCLUDED.text_answer,
             updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.question_id)
    .bind(Json(params.selected_options))
    .bind(params.text_answer)
    .bind(ReviewStatus::NotRequired)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_submission(
    executor: impl PgExecutor<'_>,
    submission_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE submission_id = $1 ORDER BY created_at"
    ))
    .bind(submission_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!("SELECT {COLUMNS} FROM answers WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn record_result(
    executor: impl PgExecutor<'_>,
    result: AnswerResult<'_>,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE answers
         SET is_correct = $1,
             points_awarded = $2,
             review_status = $3,
             updated_at = $4
         WHERE id = $5",
    )
    .bind(result.is_correct)
    .bind(result.points_awarded)
    .bind(result.review_status)
    .bind(now)
    .bind(result.answer_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn grade(
    executor: impl PgExecutor<'_>,
    id: &str,
    points: f64,
    feedback: Option<&str>,
    graded_by: &str,
    now: PrimitiveDateTime,
) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "UPDATE answers
         SET points_awarded = $1,
             feedback = $2,
             review_status = $3,
             flag_reason = NULL,
             graded_by = $4,
             graded_at = $5,
             updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}"
    ))
    .bind(points)
    .bind(feedback)
    .bind(ReviewStatus::Graded)
    .bind(graded_by)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn flag(
    executor: impl PgExecutor<'_>,
    id: &str,
    reason: &str,
    now: PrimitiveDateTime,
) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "UPDATE answers
         SET review_status = $1,
             flag_reason = $2,
             points_awarded = NULL,
             graded_by = NULL,
             graded_at = NULL,
             updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(ReviewStatus::Flagged)
    .bind(reason)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn set_ai_draft(
    executor: impl PgExecutor<'_>,
    id: &str,
    draft: &serde_json::Value,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE answers SET ai_draft = $1, updated_at = $2 WHERE id = $3")
        .bind(Json(draft))
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Answers on the submission still waiting for a teacher.
pub(crate) async fn count_outstanding(
    executor: impl PgExecutor<'_>,
    submission_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*)
         FROM answers
         WHERE submission_id = $1
           AND review_status IN ($2, $3)",
    )
    .bind(submission_id)
    .bind(ReviewStatus::Pending)
    .bind(ReviewStatus::Flagged)
    .fetch_one(executor)
    .await
}

pub(crate) async fn sum_points(
    executor: impl PgExecutor<'_>,
    submission_id: &str,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(points_awarded), 0)::DOUBLE PRECISION
         FROM answers
         WHERE submission_id = $1",
    )
    .bind(submission_id)
    .fetch_one(executor)
    .await
}
