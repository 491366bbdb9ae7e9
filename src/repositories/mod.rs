pub(crate) mod answers;
pub(crate) mod assessments;
pub(crate) mod courses;
pub(crate) mod grading_queue;
pub(crate) mod health;
pub(crate) mod locks;
pub(crate) mod messages;
pub(crate) mod questions;
pub(crate) mod submissions;
pub(crate) mod users;
