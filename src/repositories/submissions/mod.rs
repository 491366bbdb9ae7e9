mod commands;
mod queries;
mod types;

pub(crate) use commands::{create_pending_if_absent, finalize_grade, mark_submitted};
pub(crate) use queries::{
    count_attempts, exists_for_assessment, find_by_id, find_for_update, find_pending,
    list_by_student_assessment,
};
pub(crate) use types::{CreatePending, SubmitUpdate};
