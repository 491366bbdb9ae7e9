use std::collections::HashMap;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{elapsed_seconds, primitive_now_utc};
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::repositories;
use crate::services::quiz_sessions::{upsert_validated, ASSESSMENT_NOT_FOUND};
use crate::services::{attempt_policy, auto_grading};
use crate::services::{internal, ServiceError};

#[derive(Debug)]
pub(crate) struct SubmittedAnswer {
    pub(crate) question_id: String,
    pub(crate) selected_options: Vec<String>,
    pub(crate) text_answer: Option<String>,
}

/// Closes a pending attempt: stores any final answers, scores objective questions, and either
/// finalizes the grade or hands subjective answers to the review queue.
pub(crate) async fn submit_quiz(
    state: &AppState,
    assessment_id: &str,
    student_id: &str,
    submission_id: &str,
    answers: Vec<SubmittedAnswer>,
) -> Result<Submission, ServiceError> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await.map_err(internal("Failed to begin transaction"))?;

    let submission = repositories::submissions::find_for_update(&mut *tx, submission_id)
        .await
        .map_err(internal("Failed to lock submission"))?
        .filter(|submission| submission.assessment_id == assessment_id)
        .ok_or_else(|| ServiceError::not_found("Submission not found"))?;

    if submission.student_id != student_id {
        return Err(ServiceError::forbidden("Submission belongs to another student"));
    }
    if submission.status != SubmissionStatus::Pending {
        return Err(ServiceError::conflict("Submission has already been submitted"));
    }

    let assessment = repositories::assessments::find_by_id(&mut *tx, assessment_id)
        .await
        .map_err(internal("Failed to fetch assessment"))?
        .ok_or_else(|| ServiceError::not_found(ASSESSMENT_NOT_FOUND))?;
    let questions = repositories::questions::list_by_assessment(&mut *tx, assessment_id)
        .await
        .map_err(internal("Failed to fetch questions"))?;

    let grace_seconds = state.settings().quiz().submit_grace_seconds;
    if attempt_policy::accepts_answers(submission.expires_at, now, grace_seconds) {
        let by_id: HashMap<&str, _> =
            questions.iter().map(|question| (question.id.as_str(), question)).collect();
        for answer in &answers {
            let question = by_id.get(answer.question_id.as_str()).ok_or_else(|| {
                ServiceError::validation(format!(
                    "Question {} is not part of this assessment",
                    answer.question_id
                ))
            })?;
            upsert_validated(
                &mut *tx,
                &submission.id,
                question,
                &answer.selected_options,
                answer.text_answer.as_deref(),
                now,
            )
            .await?;
        }
    } else if !answers.is_empty() {
        tracing::warn!(
            submission_id = %submission.id,
            ignored = answers.len(),
            "Ignoring answers submitted after the deadline"
        );
    }

    let stored = repositories::answers::list_by_submission(&mut *tx, &submission.id)
        .await
        .map_err(internal("Failed to fetch answers"))?;
    let outcome = auto_grading::grade_submission(assessment.total_points, &questions, &stored);

    if outcome.missing_required > 0
        && !attempt_policy::time_limit_elapsed(submission.expires_at, now)
    {
        metrics::record_quiz_submission("incomplete");
        return Err(ServiceError::validation(format!(
            "{} required question(s) are unanswered",
            outcome.missing_required
        )));
    }

    for grade in &outcome.grades {
        repositories::answers::record_result(
            &mut *tx,
            repositories::answers::AnswerResult {
                answer_id: &grade.answer_id,
                is_correct: grade.is_correct,
                points_awarded: grade.points_awarded,
                review_status: grade.review_status,
            },
            now,
        )
        .await
        .map_err(internal("Failed to store answer result"))?;
    }

    let time_spent_seconds =
        i32::try_from(elapsed_seconds(submission.started_at, now)).unwrap_or(i32::MAX);
    let finalized = !outcome.needs_review;
    let updated = repositories::submissions::mark_submitted(
        &mut *tx,
        &submission.id,
        repositories::submissions::SubmitUpdate {
            finalized,
            submitted_at: now,
            score: outcome.score,
            total_points: outcome.total_points,
            percentage: auto_grading::percentage(outcome.score, outcome.total_points),
            time_spent_seconds,
        },
    )
    .await
    .map_err(internal("Failed to update submission"))?;

    tx.commit().await.map_err(internal("Failed to commit transaction"))?;

    metrics::record_quiz_submission(if finalized { "graded" } else { "submitted" });
    tracing::info!(
        submission_id = %updated.id,
        assessment_id,
        student_id,
        score = outcome.score,
        total_points = outcome.total_points,
        needs_review = outcome.needs_review,
        "Quiz submitted"
    );

    Ok(updated)
}
