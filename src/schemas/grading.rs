use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::pagination::default_limit;
use crate::core::time::format_primitive;
use crate::db::types::{QuestionType, ReviewStatus, SubmissionStatus};
use crate::schemas::submission::{AnswerResponse, SubmissionResponse};
use crate::services::grading_queue::{GradedItem, Priority, QueueItem, QueueQuery, QueueStats};

#[derive(Debug, Deserialize)]
pub(crate) struct QueueListQuery {
    #[serde(default)]
    pub(crate) assessment_id: Option<String>,
    #[serde(default)]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    pub(crate) question_type: Option<QuestionType>,
    #[serde(default)]
    pub(crate) priority: Option<Priority>,
    #[serde(default)]
    pub(crate) status: Option<ReviewStatus>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

impl QueueListQuery {
    pub(crate) fn into_query(self) -> QueueQuery {
        QueueQuery {
            assessment_id: self.assessment_id,
            course_id: self.course_id,
            question_type: self.question_type,
            priority: self.priority,
            status: self.status,
            skip: self.skip,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeItemRequest {
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    #[validate(length(max = 10000, message = "feedback is too long"))]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct FlagItemRequest {
    #[validate(length(min = 1, max = 2000, message = "reason must be 1-2000 characters"))]
    pub(crate) reason: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueueItemResponse {
    pub(crate) item_id: String,
    pub(crate) submission_id: String,
    pub(crate) assessment_id: String,
    pub(crate) assessment_title: String,
    pub(crate) course_id: String,
    pub(crate) question_id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) reference_answer: Option<String>,
    pub(crate) max_points: f64,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) text_answer: Option<String>,
    pub(crate) selected_options: Vec<String>,
    pub(crate) review_status: ReviewStatus,
    pub(crate) points_awarded: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) flag_reason: Option<String>,
    pub(crate) ai_draft: Option<serde_json::Value>,
    pub(crate) submission_status: SubmissionStatus,
    pub(crate) submitted_at: String,
    pub(crate) priority: Priority,
}

impl QueueItemResponse {
    pub(crate) fn from_item(item: QueueItem) -> Self {
        let row = item.row;
        Self {
            item_id: row.answer_id,
            submission_id: row.submission_id,
            assessment_id: row.assessment_id,
            assessment_title: row.assessment_title,
            course_id: row.course_id,
            question_id: row.question_id,
            question_type: row.question_type,
            prompt: row.prompt,
            reference_answer: row.reference_answer,
            max_points: row.max_points,
            student_id: row.student_id,
            student_name: row.student_name,
            text_answer: row.text_answer,
            selected_options: row.selected_options.0,
            review_status: row.review_status,
            points_awarded: row.points_awarded,
            feedback: row.feedback,
            flag_reason: row.flag_reason,
            ai_draft: row.ai_draft.map(|draft| draft.0),
            submission_status: row.submission_status,
            submitted_at: format_primitive(row.submitted_at),
            priority: item.priority,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QueueStatsResponse {
    pub(crate) pending: i64,
    pub(crate) flagged: i64,
    pub(crate) graded_last_7_days: i64,
    pub(crate) high_priority: i64,
    pub(crate) oldest_pending_submitted_at: Option<String>,
}

impl QueueStatsResponse {
    pub(crate) fn from_stats(stats: QueueStats) -> Self {
        Self {
            pending: stats.pending,
            flagged: stats.flagged,
            graded_last_7_days: stats.graded_last_7_days,
            high_priority: stats.high_priority,
            oldest_pending_submitted_at: stats.oldest_pending_submitted_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeItemResponse {
    pub(crate) answer: AnswerResponse,
    pub(crate) submission: SubmissionResponse,
}

impl GradeItemResponse {
    pub(crate) fn from_graded(graded: GradedItem) -> Self {
        Self {
            answer: AnswerResponse::from_db(graded.answer),
            submission: SubmissionResponse::from_db(graded.submission),
        }
    }
}
