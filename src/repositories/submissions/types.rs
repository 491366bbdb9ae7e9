use time::PrimitiveDateTime;

pub(crate) const COLUMNS: &str = "\
    id, assessment_id, student_id, attempt_number, status, started_at, expires_at, \
    submitted_at, graded_at, score, total_points, percentage, time_spent_seconds, \
    created_at, updated_at";

pub(crate) struct CreatePending<'a> {
    pub(crate) id: &'a str,
    pub(crate) assessment_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: Option<PrimitiveDateTime>,
    pub(crate) total_points: f64,
}

/// Result of closing a pending attempt.
pub(crate) struct SubmitUpdate {
    pub(crate) finalized: bool,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) percentage: f64,
    pub(crate) time_spent_seconds: i32,
}
