use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::{require_non_blank, validate_payload};
use crate::core::state::AppState;
use crate::schemas::grading::{
    FlagItemRequest, GradeItemRequest, GradeItemResponse, QueueItemResponse, QueueListQuery,
    QueueStatsResponse,
};
use crate::schemas::submission::AnswerResponse;
use crate::services::ai_grading::AiDraft;
use crate::services::grading_queue;

pub(super) async fn list_queue(
    CurrentTeacher(reviewer): CurrentTeacher,
    State(state): State<AppState>,
    Query(params): Query<QueueListQuery>,
) -> Result<Json<PaginatedResponse<QueueItemResponse>>, ApiError> {
    let page = grading_queue::list_queue(&state, &reviewer, params.into_query()).await?;

    Ok(Json(PaginatedResponse {
        items: page.items.into_iter().map(QueueItemResponse::from_item).collect(),
        total_count: page.total_count,
        skip: page.skip,
        limit: page.limit,
    }))
}

pub(super) async fn queue_stats(
    CurrentTeacher(reviewer): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<QueueStatsResponse>, ApiError> {
    let stats = grading_queue::queue_stats(&state, &reviewer).await?;
    Ok(Json(QueueStatsResponse::from_stats(stats)))
}

pub(super) async fn grade_item(
    Path(item_id): Path<String>,
    CurrentTeacher(reviewer): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<GradeItemRequest>,
) -> Result<Json<GradeItemResponse>, ApiError> {
    validate_payload(&payload)?;

    let graded = grading_queue::grade_item(
        &state,
        &reviewer,
        &item_id,
        payload.points,
        payload.feedback.as_deref(),
    )
    .await?;
    Ok(Json(GradeItemResponse::from_graded(graded)))
}

pub(super) async fn flag_item(
    Path(item_id): Path<String>,
    CurrentTeacher(reviewer): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<FlagItemRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    validate_payload(&payload)?;
    require_non_blank("reason", &payload.reason)?;

    let answer =
        grading_queue::flag_item(&state, &reviewer, &item_id, payload.reason.trim()).await?;
    Ok(Json(AnswerResponse::from_db(answer)))
}

pub(super) async fn draft_evaluation(
    Path(item_id): Path<String>,
    CurrentTeacher(reviewer): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<AiDraft>, ApiError> {
    let draft = grading_queue::draft_evaluation(&state, &reviewer, &item_id).await?;
    Ok(Json(draft))
}
