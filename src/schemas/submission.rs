use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Answer, Submission};
use crate::db::types::{ReviewStatus, SubmissionStatus};
use crate::services::quiz_sessions::SaveAnswerInput;
use crate::services::submission_grader::SubmittedAnswer;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveAnswerRequest {
    #[validate(length(min = 1, message = "submission_id must not be empty"))]
    pub(crate) submission_id: String,
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) selected_options: Vec<String>,
    #[serde(default)]
    pub(crate) text_answer: Option<String>,
}

impl SaveAnswerRequest {
    pub(crate) fn into_input(self) -> SaveAnswerInput {
        SaveAnswerInput {
            submission_id: self.submission_id,
            question_id: self.question_id,
            selected_options: self.selected_options,
            text_answer: self.text_answer,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAnswerItem {
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) selected_options: Vec<String>,
    #[serde(default)]
    pub(crate) text_answer: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitQuizRequest {
    #[validate(length(min = 1, message = "submission_id must not be empty"))]
    pub(crate) submission_id: String,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) answers: Vec<SubmitAnswerItem>,
}

impl SubmitQuizRequest {
    pub(crate) fn into_answers(self) -> (String, Vec<SubmittedAnswer>) {
        let answers = self
            .answers
            .into_iter()
            .map(|item| SubmittedAnswer {
                question_id: item.question_id,
                selected_options: item.selected_options,
                text_answer: item.text_answer,
            })
            .collect();
        (self.submission_id, answers)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: SubmissionStatus,
    pub(crate) started_at: String,
    pub(crate) expires_at: Option<String>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) graded_at: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: f64,
    pub(crate) percentage: Option<f64>,
    pub(crate) time_spent_seconds: Option<i32>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            assessment_id: submission.assessment_id,
            student_id: submission.student_id,
            attempt_number: submission.attempt_number,
            status: submission.status,
            started_at: format_primitive(submission.started_at),
            expires_at: submission.expires_at.map(format_primitive),
            submitted_at: submission.submitted_at.map(format_primitive),
            graded_at: submission.graded_at.map(format_primitive),
            score: submission.score,
            total_points: submission.total_points,
            percentage: submission.percentage,
            time_spent_seconds: submission.time_spent_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StartQuizResponse {
    pub(crate) submission: SubmissionResponse,
    pub(crate) resumed: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_options: Vec<String>,
    pub(crate) text_answer: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
    pub(crate) review_status: ReviewStatus,
    pub(crate) feedback: Option<String>,
    pub(crate) flag_reason: Option<String>,
    pub(crate) graded_at: Option<String>,
    pub(crate) updated_at: String,
}

impl AnswerResponse {
    pub(crate) fn from_db(answer: Answer) -> Self {
        Self {
            id: answer.id,
            submission_id: answer.submission_id,
            question_id: answer.question_id,
            selected_options: answer.selected_options.0,
            text_answer: answer.text_answer,
            is_correct: answer.is_correct,
            points_awarded: answer.points_awarded,
            review_status: answer.review_status,
            feedback: answer.feedback,
            flag_reason: answer.flag_reason,
            graded_at: answer.graded_at.map(format_primitive),
            updated_at: format_primitive(answer.updated_at),
        }
    }
}
