use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::ai_grading::AiDraftService;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    ai: Option<AiDraftService>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        ai: Option<AiDraftService>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, ai }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    /// AI draft evaluation client; absent when no model endpoint is configured.
    pub(crate) fn ai(&self) -> Option<&AiDraftService> {
        self.inner.ai.as_ref()
    }
}
