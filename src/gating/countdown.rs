use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CountdownState {
    pub expired: bool,
    pub remaining_seconds: u64,
    pub text: String, // HH:MM:SS
}

/// Time left until the daily limit resets, formatted for the blocked screen.
pub fn countdown_state(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> CountdownState {
    let diff_ms = (reset_at - now).num_milliseconds();

    if diff_ms <= 0 {
        return CountdownState {
            expired: true,
            remaining_seconds: 0,
            text: "00:00:00".to_string(),
        };
    }

    let total_seconds = (diff_ms / 1000) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    CountdownState {
        expired: false,
        remaining_seconds: total_seconds,
        text: format!("{:02}:{:02}:{:02}", hours, minutes, seconds),
    }
}
