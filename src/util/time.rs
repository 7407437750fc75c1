use chrono::{DateTime, Utc};

/// Formats `at` relative to `now` for the notification list.
///
/// - under a minute (or in the future, from clock skew): `"just now"`
/// - under an hour: `"5m ago"`
/// - under a day: `"3h ago"`
/// - under a week: `"2d ago"`
/// - otherwise the calendar date, e.g. `"Mar 4, 2025"`
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    let days = elapsed.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }
    at.format("%b %-d, %Y").to_string()
}
