mod authoring;
mod handlers;

use axum::{routing::get, routing::patch, routing::post, Router};

use crate::core::state::AppState;

/// Student quiz-taking routes.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:assessment_id/questions", get(handlers::get_questions))
        .route("/:assessment_id/eligibility", get(handlers::get_eligibility))
        .route("/:assessment_id/attempts", get(handlers::list_attempts))
        .route("/:assessment_id/start", post(handlers::start_quiz))
        .route("/:assessment_id/save-answer", post(handlers::save_answer))
        .route("/:assessment_id/submit", post(handlers::submit_quiz))
}

/// Teacher authoring routes.
pub(crate) fn teacher_router() -> Router<AppState> {
    Router::new()
        .route("/", post(authoring::create_assessment))
        .route("/:assessment_id", patch(authoring::update_assessment))
}
