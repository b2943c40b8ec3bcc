use chrono::{DateTime, Local, TimeZone};

#[cfg(target_arch = "wasm32")]
pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

pub(crate) fn new_note_id() -> String {
    format!("note-{}", uuid::Uuid::new_v4())
}

/// Render an epoch-millis timestamp for the note list, in the given zone.
pub(crate) fn format_timestamp_in<Tz: TimeZone>(ms: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match DateTime::from_timestamp_millis(ms) {
        Some(utc) => utc.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string(),
        None => String::new(),
    }
}

pub(crate) fn format_timestamp(ms: i64) -> String {
    format_timestamp_in(ms, &Local)
}

/// Parse an ISO-8601 timestamp (as written by `Date.prototype.toISOString`).
pub(crate) fn parse_iso_ms(s: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.timestamp_millis())
}
