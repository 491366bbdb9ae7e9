mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

/// Student-facing messaging with the rolling quota.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/quota", get(handlers::get_quota))
        .route("/", get(handlers::list_conversation).post(handlers::send_to_teacher))
        .route("/:message_id/read", post(handlers::mark_read))
}

/// Teacher replies. Not counted against any quota.
pub(crate) fn teacher_router() -> Router<AppState> {
    Router::new().route("/", post(handlers::send_to_student))
}

#[cfg(test)]
mod tests;
