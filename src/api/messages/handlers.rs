use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStudent, CurrentTeacher, CurrentUser};
use crate::api::pagination::{clamp_page, PaginatedResponse};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::schemas::message::{
    ConversationQuery, MessageResponse, MessageToStudentRequest, MessageToTeacherRequest,
    QuotaQuery, QuotaResponse, SentMessageResponse,
};
use crate::services::message_quota;

pub(super) async fn get_quota(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Query(params): Query<QuotaQuery>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let snapshot =
        message_quota::get_message_quota(&state, &student.id, params.teacher_id.trim()).await?;
    Ok(Json(QuotaResponse::from_snapshot(snapshot)))
}

pub(super) async fn send_to_teacher(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<MessageToTeacherRequest>,
) -> Result<(StatusCode, Json<SentMessageResponse>), ApiError> {
    validate_payload(&payload)?;

    let sent = message_quota::send_message_to_teacher(
        &state,
        &student,
        payload.teacher_id.trim(),
        &payload.body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(SentMessageResponse::from_sent(sent))))
}

pub(super) async fn send_to_student(
    CurrentTeacher(sender): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<MessageToStudentRequest>,
) -> Result<(StatusCode, Json<SentMessageResponse>), ApiError> {
    validate_payload(&payload)?;

    let sent = message_quota::send_message_to_student(
        &state,
        &sender,
        payload.student_id.trim(),
        &payload.body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(SentMessageResponse::from_sent(sent))))
}

pub(super) async fn list_conversation(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<ConversationQuery>,
) -> Result<Json<PaginatedResponse<MessageResponse>>, ApiError> {
    let (skip, limit) = clamp_page(params.skip, params.limit);
    let conversation =
        message_quota::list_conversation(&state, &user, params.with.trim(), skip, limit).await?;

    Ok(Json(PaginatedResponse {
        items: conversation.items.into_iter().map(MessageResponse::from_db).collect(),
        total_count: conversation.total_count,
        skip,
        limit,
    }))
}

pub(super) async fn mark_read(
    Path(message_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = message_quota::mark_read(&state, &user, &message_id).await?;
    Ok(Json(MessageResponse::from_db(message)))
}
