mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/queue", get(handlers::list_queue))
        .route("/queue/stats", get(handlers::queue_stats))
        .route("/queue/:item_id", post(handlers::grade_item))
        .route("/queue/:item_id/flag", post(handlers::flag_item))
        .route("/queue/:item_id/ai-draft", post(handlers::draft_evaluation))
}

#[cfg(test)]
mod tests;
