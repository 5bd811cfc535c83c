//! Countdown snapshot handed to the surface on every render.

use serde::{Deserialize, Serialize};

/// Remaining-time classification driving the countdown's UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBand {
    Normal,
    Warning,
    Critical,
    Expired,
}

impl TimeBand {
    /// Band for `remaining` given the warning and critical thresholds
    /// (300 s and 60 s by default).
    pub fn classify(remaining: u64, warning_secs: u64, critical_secs: u64) -> Self {
        if remaining == 0 {
            TimeBand::Expired
        } else if remaining <= critical_secs {
            TimeBand::Critical
        } else if remaining <= warning_secs {
            TimeBand::Warning
        } else {
            TimeBand::Normal
        }
    }
}

/// What a countdown surface shows for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerDisplay {
    pub remaining_secs: u64,
    /// `MM:SS`, or `EXPIRED` at zero.
    pub text: String,
    pub band: TimeBand,
    /// 0.0 ..= 100.0, share of the budget still left.
    pub progress_pct: f64,
}

/// `MM:SS` with zero-padded minutes; minutes grow past 99 if needed.
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
