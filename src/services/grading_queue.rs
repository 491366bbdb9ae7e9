use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime};

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{hours, primitive_now_utc};
use crate::db::models::{Answer, Submission, User};
use crate::db::types::{QuestionType, ReviewStatus, SubmissionStatus, UserRole};
use crate::repositories;
use crate::repositories::grading_queue::{PriorityWindow, QueueFilter, QueueRow};
use crate::services::ai_grading::{AiDraft, DraftRequest};
use crate::services::auto_grading;
use crate::services::{internal, ServiceError};

pub(crate) const HIGH_PRIORITY_AFTER_HOURS: i64 = 72;
pub(crate) const MEDIUM_PRIORITY_AFTER_HOURS: i64 = 24;
pub(crate) const MAX_PAGE_SIZE: i64 = 100;
const GRADED_STATS_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Default)]
pub(crate) struct QueueQuery {
    pub(crate) assessment_id: Option<String>,
    pub(crate) course_id: Option<String>,
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) priority: Option<Priority>,
    pub(crate) status: Option<ReviewStatus>,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

#[derive(Debug)]
pub(crate) struct QueueItem {
    pub(crate) row: QueueRow,
    pub(crate) priority: Priority,
}

#[derive(Debug)]
pub(crate) struct QueuePage {
    pub(crate) items: Vec<QueueItem>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

#[derive(Debug)]
pub(crate) struct QueueStats {
    pub(crate) pending: i64,
    pub(crate) flagged: i64,
    pub(crate) graded_last_7_days: i64,
    pub(crate) high_priority: i64,
    pub(crate) oldest_pending_submitted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug)]
pub(crate) struct GradedItem {
    pub(crate) answer: Answer,
    pub(crate) submission: Submission,
}

/// Flagged work is always urgent; otherwise urgency grows with time since submission.
pub(crate) fn priority_for(
    review_status: ReviewStatus,
    submitted_at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Priority {
    if review_status == ReviewStatus::Flagged {
        return Priority::High;
    }
    let waiting = now - submitted_at;
    if waiting >= hours(HIGH_PRIORITY_AFTER_HOURS) {
        Priority::High
    } else if waiting >= hours(MEDIUM_PRIORITY_AFTER_HOURS) {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub(crate) fn priority_window(priority: Priority, now: PrimitiveDateTime) -> PriorityWindow {
    let high_cutoff = now - hours(HIGH_PRIORITY_AFTER_HOURS);
    let medium_cutoff = now - hours(MEDIUM_PRIORITY_AFTER_HOURS);
    match priority {
        Priority::High => PriorityWindow::High { submitted_before: high_cutoff },
        Priority::Medium => PriorityWindow::Medium {
            submitted_before: medium_cutoff,
            submitted_after: high_cutoff,
        },
        Priority::Low => PriorityWindow::Low { submitted_after: medium_cutoff },
    }
}

pub(crate) fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

fn review_statuses(status: Option<ReviewStatus>) -> Result<Vec<ReviewStatus>, ServiceError> {
    match status {
        None => Ok(vec![ReviewStatus::Pending, ReviewStatus::Flagged]),
        Some(ReviewStatus::NotRequired) => {
            Err(ServiceError::validation("status must be one of pending, flagged, graded"))
        }
        Some(status) => Ok(vec![status]),
    }
}

/// Admins review every course; teachers only the courses they teach.
fn teacher_scope(reviewer: &User) -> Option<&str> {
    match reviewer.role {
        UserRole::Admin => None,
        _ => Some(reviewer.id.as_str()),
    }
}

pub(crate) async fn list_queue(
    state: &AppState,
    reviewer: &User,
    query: QueueQuery,
) -> Result<QueuePage, ServiceError> {
    let now = primitive_now_utc();
    let skip = query.skip.max(0);
    let limit = clamp_limit(query.limit);

    let filter = QueueFilter {
        teacher_id: teacher_scope(reviewer),
        assessment_id: query.assessment_id.as_deref(),
        course_id: query.course_id.as_deref(),
        question_type: query.question_type,
        statuses: review_statuses(query.status)?,
        priority: query.priority.map(|priority| priority_window(priority, now)),
    };

    let total_count = repositories::grading_queue::count(state.db(), &filter)
        .await
        .map_err(internal("Failed to count grading queue"))?;
    let rows = repositories::grading_queue::list(state.db(), &filter, skip, limit)
        .await
        .map_err(internal("Failed to list grading queue"))?;

    let items = rows
        .into_iter()
        .map(|row| {
            let priority = priority_for(row.review_status, row.submitted_at, now);
            QueueItem { row, priority }
        })
        .collect();

    Ok(QueuePage { items, total_count, skip, limit })
}

pub(crate) async fn queue_stats(
    state: &AppState,
    reviewer: &User,
) -> Result<QueueStats, ServiceError> {
    let now = primitive_now_utc();
    let row = repositories::grading_queue::stats(
        state.db(),
        teacher_scope(reviewer),
        now - hours(HIGH_PRIORITY_AFTER_HOURS),
        now - Duration::days(GRADED_STATS_WINDOW_DAYS),
    )
    .await
    .map_err(internal("Failed to compute grading queue stats"))?;

    Ok(QueueStats {
        pending: row.pending,
        flagged: row.flagged,
        graded_last_7_days: row.graded_recently,
        high_priority: row.high_priority,
        oldest_pending_submitted_at: row.oldest_pending_submitted_at,
    })
}

async fn load_item(
    executor: impl sqlx::PgExecutor<'_>,
    reviewer: &User,
    item_id: &str,
) -> Result<QueueRow, ServiceError> {
    let item = repositories::grading_queue::find_item(executor, item_id)
        .await
        .map_err(internal("Failed to fetch grading item"))?
        .ok_or_else(|| ServiceError::not_found("Grading item not found"))?;

    if teacher_scope(reviewer).is_some_and(|teacher_id| item.course_teacher_id != teacher_id) {
        return Err(ServiceError::forbidden("Not a teacher of this course"));
    }

    if item.review_status == ReviewStatus::NotRequired {
        return Err(ServiceError::conflict("Answer does not require manual grading"));
    }

    Ok(item)
}

/// Records a teacher's grade. The last outstanding item finalizes the submission.
pub(crate) async fn grade_item(
    state: &AppState,
    reviewer: &User,
    item_id: &str,
    points: f64,
    feedback: Option<&str>,
) -> Result<GradedItem, ServiceError> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await.map_err(internal("Failed to begin transaction"))?;

    let item = load_item(&mut *tx, reviewer, item_id).await?;
    if !points.is_finite() || points < 0.0 || points > item.max_points {
        return Err(ServiceError::validation(format!(
            "points must be between 0 and {}",
            item.max_points
        )));
    }

    let submission = repositories::submissions::find_for_update(&mut *tx, &item.submission_id)
        .await
        .map_err(internal("Failed to lock submission"))?
        .ok_or_else(|| ServiceError::not_found("Submission not found"))?;
    if submission.status != SubmissionStatus::Submitted {
        return Err(ServiceError::conflict("Submission is not awaiting review"));
    }

    let answer =
        repositories::answers::grade(&mut *tx, item_id, points, feedback, &reviewer.id, now)
            .await
            .map_err(internal("Failed to store grade"))?;

    let outstanding = repositories::answers::count_outstanding(&mut *tx, &submission.id)
        .await
        .map_err(internal("Failed to count outstanding answers"))?;

    let submission = if outstanding == 0 {
        let score = repositories::answers::sum_points(&mut *tx, &submission.id)
            .await
            .map_err(internal("Failed to sum awarded points"))?;
        let percentage = auto_grading::percentage(score, submission.total_points);
        let finalized = repositories::submissions::finalize_grade(
            &mut *tx,
            &submission.id,
            score,
            percentage,
            now,
        )
        .await
        .map_err(internal("Failed to finalize submission"))?;
        tracing::info!(submission_id = %finalized.id, score, percentage, "Submission fully graded");
        finalized
    } else {
        submission
    };

    tx.commit().await.map_err(internal("Failed to commit transaction"))?;

    metrics::record_grading_action("grade");
    tracing::info!(
        answer_id = %answer.id,
        submission_id = %submission.id,
        grader_id = %reviewer.id,
        points,
        outstanding,
        "Graded queue item"
    );

    Ok(GradedItem { answer, submission })
}

pub(crate) async fn flag_item(
    state: &AppState,
    reviewer: &User,
    item_id: &str,
    reason: &str,
) -> Result<Answer, ServiceError> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await.map_err(internal("Failed to begin transaction"))?;

    let item = load_item(&mut *tx, reviewer, item_id).await?;
    let submission = repositories::submissions::find_for_update(&mut *tx, &item.submission_id)
        .await
        .map_err(internal("Failed to lock submission"))?
        .ok_or_else(|| ServiceError::not_found("Submission not found"))?;
    if submission.status == SubmissionStatus::Graded {
        return Err(ServiceError::conflict("Submission is already graded"));
    }

    let answer = repositories::answers::flag(&mut *tx, item_id, reason.trim(), now)
        .await
        .map_err(internal("Failed to flag answer"))?;

    tx.commit().await.map_err(internal("Failed to commit transaction"))?;

    metrics::record_grading_action("flag");
    tracing::info!(answer_id = %answer.id, reviewer_id = %reviewer.id, "Flagged queue item");

    Ok(answer)
}

/// Asks the configured model for a suggested grade and stores it on the answer.
pub(crate) async fn draft_evaluation(
    state: &AppState,
    reviewer: &User,
    item_id: &str,
) -> Result<AiDraft, ServiceError> {
    let ai = state
        .ai()
        .ok_or_else(|| ServiceError::Unavailable("AI drafting is not configured".to_string()))?;

    let item = load_item(state.db(), reviewer, item_id).await?;
    if item.question_type.is_objective() {
        return Err(ServiceError::validation("Only written answers can be drafted"));
    }

    let draft = ai
        .draft_evaluation(DraftRequest {
            answer_id: item.answer_id.clone(),
            prompt: item.prompt.clone(),
            reference_answer: item.reference_answer.clone(),
            student_answer: item.text_answer.clone().unwrap_or_default(),
            max_points: item.max_points,
        })
        .await
        .map_err(|err| {
            tracing::warn!(answer_id = %item.answer_id, error = %err, "AI draft failed");
            ServiceError::Unavailable("AI drafting failed, try again later".to_string())
        })?;

    let value = serde_json::to_value(&draft).map_err(internal("Failed to encode AI draft"))?;
    repositories::answers::set_ai_draft(state.db(), item_id, &value, primitive_now_utc())
        .await
        .map_err(internal("Failed to store AI draft"))?;

    metrics::record_grading_action("ai_draft");

    Ok(draft)
}
