// Converts the server's RFC 3339 timestamp into a short local display form
pub fn format_modified(iso_datetime: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(iso_datetime) {
        dt.with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    } else {
        iso_datetime.to_string()
    }
}
