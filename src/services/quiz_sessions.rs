use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Answer, Assessment, Question, Submission};
use crate::db::types::SubmissionStatus;
use crate::repositories;
use crate::services::attempt_policy::{self, Eligibility};
use crate::services::auto_grading;
use crate::services::{internal, ServiceError};

pub(crate) const ASSESSMENT_NOT_FOUND: &str = "Assessment not found";

#[derive(Debug)]
pub(crate) struct StartedQuiz {
    pub(crate) submission: Submission,
    pub(crate) resumed: bool,
}

#[derive(Debug)]
pub(crate) struct SaveAnswerInput {
    pub(crate) submission_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_options: Vec<String>,
    pub(crate) text_answer: Option<String>,
}

/// Published assessment the student is enrolled for, or NotFound.
pub(crate) async fn load_for_student(
    state: &AppState,
    assessment_id: &str,
    student_id: &str,
) -> Result<Assessment, ServiceError> {
    repositories::assessments::find_for_student(state.db(), assessment_id, student_id)
        .await
        .map_err(internal("Failed to fetch assessment"))?
        .ok_or_else(|| ServiceError::not_found(ASSESSMENT_NOT_FOUND))
}

pub(crate) async fn can_take_assessment(
    state: &AppState,
    assessment_id: &str,
    student_id: &str,
) -> Result<Eligibility, ServiceError> {
    let assessment = load_for_student(state, assessment_id, student_id).await?;
    eligibility_for(state, &assessment, student_id).await
}

pub(crate) async fn eligibility_for(
    state: &AppState,
    assessment: &Assessment,
    student_id: &str,
) -> Result<Eligibility, ServiceError> {
    let pending = repositories::submissions::find_pending(state.db(), &assessment.id, student_id)
        .await
        .map_err(internal("Failed to fetch pending submission"))?;
    let attempt_count =
        repositories::submissions::count_attempts(state.db(), &assessment.id, student_id)
            .await
            .map_err(internal("Failed to count attempts"))?;

    Ok(attempt_policy::evaluate(
        assessment,
        attempt_count,
        pending.map(|submission| submission.id),
        primitive_now_utc(),
    ))
}

/// Starts a new attempt or resumes the pending one. Concurrent calls for the same student and
/// assessment serialize on an advisory lock and converge on a single pending row.
pub(crate) async fn start_quiz(
    state: &AppState,
    assessment_id: &str,
    student_id: &str,
) -> Result<StartedQuiz, ServiceError> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await.map_err(internal("Failed to begin transaction"))?;

    let assessment =
        repositories::assessments::find_for_student(&mut *tx, assessment_id, student_id)
            .await
            .map_err(internal("Failed to fetch assessment"))?
            .ok_or_else(|| ServiceError::not_found(ASSESSMENT_NOT_FOUND))?;

    repositories::locks::acquire_xact_lock(&mut *tx, "start_quiz", &[assessment_id, student_id])
        .await
        .map_err(internal("Failed to acquire attempt lock"))?;

    if let Some(pending) =
        repositories::submissions::find_pending(&mut *tx, assessment_id, student_id)
            .await
            .map_err(internal("Failed to fetch pending submission"))?
    {
        tx.commit().await.map_err(internal("Failed to commit transaction"))?;
        tracing::info!(submission_id = %pending.id, assessment_id, student_id, "Resumed quiz attempt");
        return Ok(StartedQuiz { submission: pending, resumed: true });
    }

    let attempt_count =
        repositories::submissions::count_attempts(&mut *tx, assessment_id, student_id)
            .await
            .map_err(internal("Failed to count attempts"))?;
    let eligibility = attempt_policy::evaluate(&assessment, attempt_count, None, now);
    if !eligibility.can_take {
        return Err(ServiceError::conflict(
            eligibility.reason.unwrap_or_else(|| "Assessment cannot be started".to_string()),
        ));
    }

    let questions = repositories::questions::list_by_assessment(&mut *tx, assessment_id)
        .await
        .map_err(internal("Failed to fetch questions"))?;
    let total_points = auto_grading::effective_total_points(assessment.total_points, &questions);
    let expires_at = attempt_policy::compute_expiration(
        now,
        assessment.time_limit_minutes,
        assessment.due_date,
    );

    let submission_id = Uuid::new_v4().to_string();
    let attempt_number = i32::try_from(attempt_count + 1)
        .map_err(|_| ServiceError::conflict(attempt_policy::REASON_MAX_ATTEMPTS))?;
    let inserted = repositories::submissions::create_pending_if_absent(
        &mut *tx,
        repositories::submissions::CreatePending {
            id: &submission_id,
            assessment_id,
            student_id,
            attempt_number,
            started_at: now,
            expires_at,
            total_points,
        },
    )
    .await
    .map_err(internal("Failed to create submission"))?;

    let started = match inserted {
        Some(submission) => StartedQuiz { submission, resumed: false },
        None => {
            let winner =
                repositories::submissions::find_pending(&mut *tx, assessment_id, student_id)
                    .await
                    .map_err(internal("Failed to fetch pending submission"))?
                    .ok_or_else(|| ServiceError::conflict("Attempt was started concurrently"))?;
            StartedQuiz { submission: winner, resumed: true }
        }
    };

    tx.commit().await.map_err(internal("Failed to commit transaction"))?;

    tracing::info!(
        submission_id = %started.submission.id,
        assessment_id,
        student_id,
        attempt_number = started.submission.attempt_number,
        resumed = started.resumed,
        "Started quiz attempt"
    );

    Ok(started)
}

/// Writes one answer while the attempt is still pending. The submission row is locked for the
/// whole write so a concurrent submit either sees this answer or makes the save fail.
pub(crate) async fn save_answer(
    state: &AppState,
    assessment_id: &str,
    student_id: &str,
    input: SaveAnswerInput,
) -> Result<Answer, ServiceError> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await.map_err(internal("Failed to begin transaction"))?;

    let submission = repositories::submissions::find_for_update(&mut *tx, &input.submission_id)
        .await
        .map_err(internal("Failed to lock submission"))?
        .filter(|submission| submission.assessment_id == assessment_id)
        .ok_or_else(|| ServiceError::not_found("Submission not found"))?;

    if submission.student_id != student_id {
        return Err(ServiceError::forbidden("Submission belongs to another student"));
    }
    if submission.status != SubmissionStatus::Pending {
        return Err(ServiceError::conflict("Submission is no longer in progress"));
    }
    if !attempt_policy::accepts_answers(
        submission.expires_at,
        now,
        state.settings().quiz().submit_grace_seconds,
    ) {
        return Err(ServiceError::conflict("Submission deadline has passed"));
    }

    let question =
        repositories::questions::find_in_assessment(&mut *tx, assessment_id, &input.question_id)
            .await
            .map_err(internal("Failed to fetch question"))?
            .ok_or_else(|| ServiceError::validation("Question is not part of this assessment"))?;

    let answer = upsert_validated(
        &mut *tx,
        &submission.id,
        &question,
        &input.selected_options,
        input.text_answer.as_deref(),
        now,
    )
    .await?;

    tx.commit().await.map_err(internal("Failed to commit transaction"))?;

    Ok(answer)
}

/// Validates the payload against `question` and writes it.
pub(crate) async fn upsert_validated(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
    question: &Question,
    selected_options: &[String],
    text_answer: Option<&str>,
    now: time::PrimitiveDateTime,
) -> Result<Answer, ServiceError> {
    let normalized = auto_grading::validate_answer(question, selected_options, text_answer)
        .map_err(ServiceError::Validation)?;

    let answer_id = Uuid::new_v4().to_string();
    repositories::answers::upsert(
        executor,
        repositories::answers::UpsertAnswer {
            id: &answer_id,
            submission_id,
            question_id: &question.id,
            selected_options: &normalized.selected_options,
            text_answer: normalized.text_answer.as_deref(),
            now,
        },
    )
    .await
    .map_err(internal("Failed to save answer"))
}

pub(crate) async fn list_attempts(
    state: &AppState,
    assessment_id: &str,
    student_id: &str,
) -> Result<Vec<Submission>, ServiceError> {
    load_for_student(state, assessment_id, student_id).await?;
    repositories::submissions::list_by_student_assessment(state.db(), assessment_id, student_id)
        .await
        .map_err(internal("Failed to list attempts"))
}

/// Questions a student may see. Empty unless an attempt can be started or resumed, so prompts
/// stay hidden before the window opens and after the attempts run out.
pub(crate) async fn list_questions(
    state: &AppState,
    assessment_id: &str,
    eligibility: &Eligibility,
) -> Result<Vec<Question>, ServiceError> {
    if !eligibility.can_take {
        return Ok(Vec::new());
    }
    repositories::questions::list_by_assessment(state.db(), assessment_id)
        .await
        .map_err(internal("Failed to fetch questions"))
}
