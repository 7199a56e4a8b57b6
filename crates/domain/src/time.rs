//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for `last_updated`.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Return a refresh timestamp that never goes backwards relative to `previous`.
#[must_use]
pub fn advance(previous: Timestamp) -> Timestamp {
    now().max(previous)
}

/// Human-friendly age of `ts` as seen at `reference`.
///
/// Future timestamps count as "just now".
#[must_use]
pub fn relative(ts: Timestamp, reference: Timestamp) -> String {
    let seconds = (reference - ts).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else {
        format!("{}d ago", hours / 24)
    }
}
