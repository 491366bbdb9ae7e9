pub(crate) mod assessments;
pub(crate) mod errors;
pub(crate) mod grading;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod messages;
pub(crate) mod pagination;
pub(crate) mod router;
pub(crate) mod validation;
