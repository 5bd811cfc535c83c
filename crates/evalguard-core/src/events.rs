//! Events emitted by the countdown and session engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerDisplay;

/// One-shot countdown notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    FiveMinutes,
    OneMinute,
}

/// What pushed the countdown into its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryCause {
    /// Local remaining time reached zero.
    Countdown,
    /// The server oracle reported the attempt as expired.
    Server,
}

/// Every state change of an evaluation countdown produces an event.
/// The driver forwards them to the surface; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    Display(TimerDisplay),
    Warning {
        kind: WarningKind,
        remaining_secs: u64,
    },
    /// Local time disagreed with the server beyond tolerance and was rebased.
    Resynced {
        client_secs: u64,
        server_secs: u64,
        at: DateTime<Utc>,
    },
    Expired {
        cause: ExpiryCause,
        at: DateTime<Utc>,
    },
}

/// State changes of the session timeout monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    WarningShown {
        remaining_secs: u64,
        countdown: String,
    },
    CountdownUpdated {
        remaining_secs: u64,
        countdown: String,
    },
    WarningHidden,
    /// Activity crossed the refresh interval; ask the server to extend quietly.
    RefreshDue,
    Extended,
    ExtendFailed,
    Expired,
}
