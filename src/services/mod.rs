use thiserror::Error;

pub(crate) mod ai_grading;
pub(crate) mod assessment_authoring;
pub(crate) mod attempt_policy;
pub(crate) mod auto_grading;
pub(crate) mod grading_queue;
pub(crate) mod message_quota;
pub(crate) mod quiz_sessions;
pub(crate) mod submission_grader;

/// Domain failures raised by the workflow services. The HTTP layer maps each variant to a status.
#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{context}")]
    Internal {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ServiceError {
    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

/// `map_err` adapter attaching `context` to storage or client failures.
pub(crate) fn internal<E>(context: &'static str) -> impl FnOnce(E) -> ServiceError
where
    E: Into<anyhow::Error>,
{
    move |err| ServiceError::Internal { context, source: err.into() }
}
