use chrono::Utc;

/// Current UTC time as an RFC 3339 string, e.g. `2026-10-16T09:12:44.120+00:00`.
/// Stored in install records.
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339()
}
