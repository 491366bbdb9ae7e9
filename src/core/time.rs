use time::{
    format_description::well_known::Rfc3339, Duration, OffsetDateTime, PrimitiveDateTime,
    UtcOffset,
};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Whole seconds from `earlier` to `later`, never negative.
pub(crate) fn elapsed_seconds(earlier: PrimitiveDateTime, later: PrimitiveDateTime) -> i64 {
    (later - earlier).whole_seconds().max(0)
}

pub(crate) fn earliest(
    first: Option<PrimitiveDateTime>,
    second: Option<PrimitiveDateTime>,
) -> Option<PrimitiveDateTime> {
    match (first, second) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, other) => other,
    }
}

pub(crate) fn hours(value: i64) -> Duration {
    Duration::hours(value)
}
