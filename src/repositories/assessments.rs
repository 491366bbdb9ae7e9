use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Assessment;

const COLUMNS: &str = "\
    id, course_id, title, description, time_limit_minutes, max_attempts, available_from, \
    due_date, total_points, is_published, created_by, created_at, updated_at";

/// Field values shared by create and update.
pub(crate) struct AssessmentFields<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) max_attempts: i32,
    pub(crate) available_from: Option<PrimitiveDateTime>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) total_points: f64,
    pub(crate) is_published: bool,
}

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!("SELECT {COLUMNS} FROM assessments WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Published assessment visible to an enrolled student.
pub(crate) async fn find_for_student(
    executor: impl PgExecutor<'_>,
    id: &str,
    student_id: &str,
) -> Result<Option<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {COLUMNS}
         FROM assessments a
         WHERE a.id = $1
           AND a.is_published
           AND EXISTS (
               SELECT 1 FROM course_enrollments ce
               WHERE ce.course_id = a.course_id AND ce.student_id = $2
           )"
    ))
    .bind(id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    id: &str,
    course_id: &str,
    created_by: &str,
    fields: AssessmentFields<'_>,
    now: PrimitiveDateTime,
) -> Result<Assessment, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "INSERT INTO assessments (
            id, course_id, title, description, time_limit_minutes, max_attempts,
            available_from, due_date, total_points, is_published, created_by,
            created_at, updated_at
         )
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$12)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(course_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.time_limit_minutes)
    .bind(fields.max_attempts)
    .bind(fields.available_from)
    .bind(fields.due_date)
    .bind(fields.total_points)
    .bind(fields.is_published)
    .bind(created_by)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    id: &str,
    fields: AssessmentFields<'_>,
    now: PrimitiveDateTime,
) -> Result<Assessment, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "UPDATE assessments
         SET title = $1,
             description = $2,
             time_limit_minutes = $3,
             max_attempts = $4,
             available_from = $5,
             due_date = $6,
             total_points = $7,
             is_published = $8,
             updated_at = $9
         WHERE id = $10
         RETURNING {COLUMNS}"
    ))
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.time_limit_minutes)
    .bind(fields.max_attempts)
    .bind(fields.available_from)
    .bind(fields.due_date)
    .bind(fields.total_points)
    .bind(fields.is_published)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Serializes edits against attempt creation for the same assessment.
pub(crate) async fn lock_for_update(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {COLUMNS} FROM assessments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}
