use serde::Serialize;

use crate::services::grading_queue::MAX_PAGE_SIZE;

pub(crate) const fn default_limit() -> i64 {
    50
}

pub(crate) fn clamp_page(skip: i64, limit: i64) -> (i64, i64) {
    (skip.max(0), limit.clamp(1, MAX_PAGE_SIZE))
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

#[cfg(test)]
mod tests {
    use super::clamp_page;

    #[test]
    fn clamp_page_bounds_values() {
        assert_eq!(clamp_page(-3, 0), (0, 1));
        assert_eq!(clamp_page(20, 1000), (20, 100));
    }
}
