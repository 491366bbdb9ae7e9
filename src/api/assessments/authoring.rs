use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::schemas::assessment::{
    AssessmentCreate, AssessmentResponse, AssessmentUpdate, AuthoredAssessmentResponse,
    QuestionResponse,
};
use crate::services::assessment_authoring::{self, AuthoredAssessment};

fn to_response(authored: AuthoredAssessment) -> AuthoredAssessmentResponse {
    AuthoredAssessmentResponse {
        assessment: AssessmentResponse::from_db(authored.assessment),
        questions: authored.questions.into_iter().map(QuestionResponse::from_db).collect(),
    }
}

pub(super) async fn create_assessment(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<AssessmentCreate>,
) -> Result<(StatusCode, Json<AuthoredAssessmentResponse>), ApiError> {
    validate_payload(&payload)?;

    let authored =
        assessment_authoring::create_assessment(&state, &teacher, payload.into_input()).await?;
    Ok((StatusCode::CREATED, Json(to_response(authored))))
}

pub(super) async fn update_assessment(
    Path(assessment_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<AssessmentUpdate>,
) -> Result<Json<AuthoredAssessmentResponse>, ApiError> {
    validate_payload(&payload)?;

    let authored = assessment_authoring::update_assessment(
        &state,
        &teacher,
        &assessment_id,
        payload.into_patch(),
    )
    .await?;
    Ok(Json(to_response(authored)))
}
