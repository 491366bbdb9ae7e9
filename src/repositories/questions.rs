use sqlx::types::Json;
use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::{Question, QuestionOption};
use crate::db::types::QuestionType;

const COLUMNS: &str = "\
    id, assessment_id, question_type, prompt, options, correct_options, reference_answer, \
    points, order_index, is_required, created_at";

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) assessment_id: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: &'a str,
    pub(crate) options: &'a [QuestionOption],
    pub(crate) correct_options: &'a [String],
    pub(crate) reference_answer: Option<&'a str>,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    pub(crate) is_required: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn list_by_assessment(
    executor: impl PgExecutor<'_>,
    assessment_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS}
         FROM questions
         WHERE assessment_id = $1
         ORDER BY order_index, created_at"
    ))
    .bind(assessment_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_in_assessment(
    executor: impl PgExecutor<'_>,
    assessment_id: &str,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE assessment_id = $1 AND id = $2"
    ))
    .bind(assessment_id)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, assessment_id, question_type, prompt, options, correct_options,
            reference_answer, points, order_index, is_required, created_at
         )
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.assessment_id)
    .bind(params.question_type)
    .bind(params.prompt)
    .bind(Json(params.options))
    .bind(Json(params.correct_options))
    .bind(params.reference_answer)
    .bind(params.points)
    .bind(params.order_index)
    .bind(params.is_required)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete_by_assessment(
    executor: impl PgExecutor<'_>,
    assessment_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE assessment_id = $1")
        .bind(assessment_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
