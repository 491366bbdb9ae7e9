use sqlx::types::Json;
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::types::{QuestionType, ReviewStatus, SubmissionStatus};

/// One answer awaiting (or having received) manual review, with enough context to grade it.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QueueRow {
    pub(crate) answer_id: String,
    pub(crate) submission_id: String,
    pub(crate) assessment_id: String,
    pub(crate) assessment_title: String,
    pub(crate) course_id: String,
    pub(crate) course_teacher_id: String,
    pub(crate) question_id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) reference_answer: Option<String>,
    pub(crate) max_points: f64,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) text_answer: Option<String>,
    pub(crate) selected_options: Json<Vec<String>>,
    pub(crate) review_status: ReviewStatus,
    pub(crate) points_awarded: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) flag_reason: Option<String>,
    pub(crate) ai_draft: Option<Json<serde_json::Value>>,
    pub(crate) submission_status: SubmissionStatus,
    pub(crate) submitted_at: PrimitiveDateTime,
}

/// Waiting-time window a priority bucket maps to. Bounds are submission timestamps.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PriorityWindow {
    /// Flagged, or submitted at or before the cutoff.
    High { submitted_before: PrimitiveDateTime },
    Medium { submitted_before: PrimitiveDateTime, submitted_after: PrimitiveDateTime },
    Low { submitted_after: PrimitiveDateTime },
}

#[derive(Debug, Default)]
pub(crate) struct QueueFilter<'a> {
    /// `None` means every course (admin view).
    pub(crate) teacher_id: Option<&'a str>,
    pub(crate) assessment_id: Option<&'a str>,
    pub(crate) course_id: Option<&'a str>,
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) statuses: Vec<ReviewStatus>,
    pub(crate) priority: Option<PriorityWindow>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QueueStatsRow {
    pub(crate) pending: i64,
    pub(crate) flagged: i64,
    pub(crate) graded_recently: i64,
    pub(crate) high_priority: i64,
    pub(crate) oldest_pending_submitted_at: Option<PrimitiveDateTime>,
}

const SELECT_ROWS: &str = "\
    SELECT a.id AS answer_id,
           s.id AS submission_id,
           asm.id AS assessment_id,
           asm.title AS assessment_title,
           asm.course_id,
           c.teacher_id AS course_teacher_id,
           q.id AS question_id,
           q.question_type,
           q.prompt,
           q.reference_answer,
           q.points AS max_points,
           u.id AS student_id,
           u.full_name AS student_name,
           a.text_answer,
           a.selected_options,
           a.review_status,
           a.points_awarded,
           a.feedback,
           a.flag_reason,
           a.ai_draft,
           s.status AS submission_status,
           s.submitted_at";

const FROM_JOINS: &str = "
    FROM answers a
    JOIN submissions s ON s.id = a.submission_id
    JOIN questions q ON q.id = a.question_id
    JOIN assessments asm ON asm.id = s.assessment_id
    JOIN courses c ON c.id = asm.course_id
    JOIN users u ON u.id = s.student_id
    WHERE s.submitted_at IS NOT NULL";

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a QueueFilter<'a>) {
    if let Some(teacher_id) = filter.teacher_id {
        builder.push(" AND c.teacher_id = ");
        builder.push_bind(teacher_id);
    }
    if let Some(assessment_id) = filter.assessment_id {
        builder.push(" AND asm.id = ");
        builder.push_bind(assessment_id);
    }
    if let Some(course_id) = filter.course_id {
        builder.push(" AND asm.course_id = ");
        builder.push_bind(course_id);
    }
    if let Some(question_type) = filter.question_type {
        builder.push(" AND q.question_type = ");
        builder.push_bind(question_type);
    }

    builder.push(" AND a.review_status IN (");
    let mut separated = builder.separated(", ");
    for status in &filter.statuses {
        separated.push_bind(*status);
    }
    separated.push_unseparated(")");

    // Ungraded work only counts once the attempt has been handed in.
    if !filter.statuses.contains(&ReviewStatus::Graded) {
        builder.push(" AND s.status = ");
        builder.push_bind(SubmissionStatus::Submitted);
    }

    match filter.priority {
        Some(PriorityWindow::High { submitted_before }) => {
            builder.push(" AND (a.review_status = ");
            builder.push_bind(ReviewStatus::Flagged);
            builder.push(" OR s.submitted_at <= ");
            builder.push_bind(submitted_before);
            builder.push(")");
        }
        Some(PriorityWindow::Medium { submitted_before, submitted_after }) => {
            builder.push(" AND a.review_status <> ");
            builder.push_bind(ReviewStatus::Flagged);
            builder.push(" AND s.submitted_at <= ");
            builder.push_bind(submitted_before);
            builder.push(" AND s.submitted_at > ");
            builder.push_bind(submitted_after);
        }
        Some(PriorityWindow::Low { submitted_after }) => {
            builder.push(" AND a.review_status <> ");
            builder.push_bind(ReviewStatus::Flagged);
            builder.push(" AND s.submitted_at > ");
            builder.push_bind(submitted_after);
        }
        None => {}
    }
}

pub(crate) async fn list(
    executor: impl PgExecutor<'_>,
    filter: &QueueFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<QueueRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(SELECT_ROWS);
    builder.push(FROM_JOINS);
    push_filters(&mut builder, filter);
    builder.push(" ORDER BY s.submitted_at, q.order_index, a.id");
    builder.push(" OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<QueueRow>().fetch_all(executor).await
}

pub(crate) async fn count(
    executor: impl PgExecutor<'_>,
    filter: &QueueFilter<'_>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
    builder.push(FROM_JOINS);
    push_filters(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(executor).await
}

/// Single queue item regardless of its review state.
pub(crate) async fn find_item(
    executor: impl PgExecutor<'_>,
    answer_id: &str,
) -> Result<Option<QueueRow>, sqlx::Error> {
    sqlx::query_as::<_, QueueRow>(&format!("{SELECT_ROWS}{FROM_JOINS} AND a.id = $1"))
        .bind(answer_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn stats(
    executor: impl PgExecutor<'_>,
    teacher_id: Option<&str>,
    high_priority_before: PrimitiveDateTime,
    graded_since: PrimitiveDateTime,
) -> Result<QueueStatsRow, sqlx::Error> {
    sqlx::query_as::<_, QueueStatsRow>(
        "SELECT
            COUNT(*) FILTER (WHERE a.review_status = $1 AND s.status = $3) AS pending,
            COUNT(*) FILTER (WHERE a.review_status = $2 AND s.status = $3) AS flagged,
            COUNT(*) FILTER (WHERE a.review_status = $4 AND a.graded_at >= $5) AS graded_recently,
            COUNT(*) FILTER (
                WHERE s.status = $3
                  AND (a.review_status = $2 OR (a.review_status = $1 AND s.submitted_at <= $6))
            ) AS high_priority,
            MIN(s.submitted_at) FILTER (WHERE a.review_status = $1 AND s.status = $3)
                AS oldest_pending_submitted_at
         FROM answers a
         JOIN submissions s ON s.id = a.submission_id
         JOIN assessments asm ON asm.id = s.assessment_id
         JOIN courses c ON c.id = asm.course_id
         WHERE s.submitted_at IS NOT NULL
           AND ($7::TEXT IS NULL OR c.teacher_id = $7)",
    )
    .bind(ReviewStatus::Pending)
    .bind(ReviewStatus::Flagged)
    .bind(SubmissionStatus::Submitted)
    .bind(ReviewStatus::Graded)
    .bind(graded_since)
    .bind(high_priority_before)
    .bind(teacher_id)
    .fetch_one(executor)
    .await
}
