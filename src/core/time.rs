use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};

/// Formats an instant as RFC 3339 in UTC.
pub(crate) fn format_utc(value: OffsetDateTime) -> String {
    let utc = value.to_offset(UtcOffset::UTC);
    utc.format(&Rfc3339).unwrap_or_else(|_| utc.to_string())
}
