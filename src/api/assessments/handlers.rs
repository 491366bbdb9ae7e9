use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::schemas::assessment::{
    AssessmentQuestionsResponse, AssessmentResponse, StudentQuestionResponse,
};
use crate::schemas::submission::{
    AnswerResponse, SaveAnswerRequest, StartQuizResponse, SubmissionResponse, SubmitQuizRequest,
};
use crate::services::attempt_policy::Eligibility;
use crate::services::{quiz_sessions, submission_grader};

pub(super) async fn get_questions(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<AssessmentQuestionsResponse>, ApiError> {
    let assessment = quiz_sessions::load_for_student(&state, &assessment_id, &student.id).await?;
    let eligibility = quiz_sessions::eligibility_for(&state, &assessment, &student.id).await?;
    let questions = quiz_sessions::list_questions(&state, &assessment.id, &eligibility).await?;

    Ok(Json(AssessmentQuestionsResponse {
        assessment: AssessmentResponse::from_db(assessment),
        questions: questions.into_iter().map(StudentQuestionResponse::from_db).collect(),
        eligibility,
    }))
}

pub(super) async fn get_eligibility(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Eligibility>, ApiError> {
    let eligibility =
        quiz_sessions::can_take_assessment(&state, &assessment_id, &student.id).await?;
    Ok(Json(eligibility))
}

pub(super) async fn list_attempts(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let attempts = quiz_sessions::list_attempts(&state, &assessment_id, &student.id).await?;
    Ok(Json(attempts.into_iter().map(SubmissionResponse::from_db).collect()))
}

pub(super) async fn start_quiz(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StartQuizResponse>), ApiError> {
    let started = quiz_sessions::start_quiz(&state, &assessment_id, &student.id).await?;
    let status = if started.resumed { StatusCode::OK } else { StatusCode::CREATED };

    Ok((
        status,
        Json(StartQuizResponse {
            submission: SubmissionResponse::from_db(started.submission),
            resumed: started.resumed,
        }),
    ))
}

pub(super) async fn save_answer(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    validate_payload(&payload)?;

    let quiz = state.settings().quiz();
    let rate_key = format!("save_answer:{}:{}", student.id, payload.submission_id);
    let allowed = state
        .redis()
        .rate_limit(&rate_key, quiz.save_answer_rate_limit, quiz.save_answer_rate_window_seconds)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Save-answer rate limit check failed");
            true
        });
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many answer saves, slow down"));
    }

    let answer =
        quiz_sessions::save_answer(&state, &assessment_id, &student.id, payload.into_input())
            .await?;
    Ok(Json(AnswerResponse::from_db(answer)))
}

pub(super) async fn submit_quiz(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    validate_payload(&payload)?;

    let (submission_id, answers) = payload.into_answers();
    let submission =
        submission_grader::submit_quiz(&state, &assessment_id, &student.id, &submission_id, answers)
            .await?;
    Ok(Json(SubmissionResponse::from_db(submission)))
}
