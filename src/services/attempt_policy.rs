use serde::Serialize;
use time::{Duration, PrimitiveDateTime};

use crate::core::time::earliest;
use crate::db::models::Assessment;

pub(crate) const REASON_PENDING: &str = "attempt in progress";
pub(crate) const REASON_NOT_YET_AVAILABLE: &str = "not yet available";
pub(crate) const REASON_PAST_DUE: &str = "past due";
pub(crate) const REASON_MAX_ATTEMPTS: &str = "maximum attempts reached";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Eligibility {
    pub(crate) can_take: bool,
    pub(crate) reason: Option<String>,
    pub(crate) attempt_count: i64,
    pub(crate) max_attempts: i32,
    pub(crate) pending_submission_id: Option<String>,
}

/// Decides whether a student may start (or resume) an attempt. Rules apply in order: a pending
/// attempt always resumes, then the availability window, then the attempt cap.
pub(crate) fn evaluate(
    assessment: &Assessment,
    attempt_count: i64,
    pending_submission_id: Option<String>,
    now: PrimitiveDateTime,
) -> Eligibility {
    let reason = if pending_submission_id.is_some() {
        None
    } else if assessment.available_from.is_some_and(|from| now < from) {
        Some(REASON_NOT_YET_AVAILABLE)
    } else if assessment.due_date.is_some_and(|due| now > due) {
        Some(REASON_PAST_DUE)
    } else if attempt_count >= i64::from(assessment.max_attempts) {
        Some(REASON_MAX_ATTEMPTS)
    } else {
        None
    };

    let resuming = pending_submission_id.is_some();
    Eligibility {
        can_take: reason.is_none(),
        reason: reason
            .or(resuming.then_some(REASON_PENDING))
            .map(str::to_string),
        attempt_count,
        max_attempts: assessment.max_attempts,
        pending_submission_id,
    }
}

/// Hard end of an attempt: the time limit or the due date, whichever comes first.
pub(crate) fn compute_expiration(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
    due_date: Option<PrimitiveDateTime>,
) -> Option<PrimitiveDateTime> {
    let limit_deadline =
        time_limit_minutes.map(|minutes| started_at + Duration::minutes(i64::from(minutes)));
    earliest(limit_deadline, due_date)
}

/// Whether writes are still accepted: before the deadline plus `grace_seconds`.
pub(crate) fn accepts_answers(
    expires_at: Option<PrimitiveDateTime>,
    now: PrimitiveDateTime,
    grace_seconds: i64,
) -> bool {
    expires_at.map_or(true, |deadline| now <= deadline + Duration::seconds(grace_seconds.max(0)))
}

pub(crate) fn time_limit_elapsed(
    expires_at: Option<PrimitiveDateTime>,
    now: PrimitiveDateTime,
) -> bool {
    expires_at.is_some_and(|deadline| now >= deadline)
}
