//! Session inactivity monitor.
//!
//! Unlike the evaluation countdown, the client keeps no independent notion of
//! remaining session time: every number comes from the server's last answer.
//! A failed status check therefore fails closed (expire) when the server
//! answered but refused, and is ignored only when it could not be reached.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::error::OracleError;
use crate::events::SessionEvent;
use crate::oracle::SessionStatus;
use crate::storage::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Active,
    Expired,
}

/// Input events that count as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Press,
    Key,
    Scroll,
    Touch,
    Click,
}

/// One status check as seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Active { remaining_secs: u64 },
    LoggedOut,
    Rejected { status: u16 },
    /// Transport or decoding failure: no new information.
    Unreachable,
}

impl From<Result<SessionStatus, OracleError>> for PollOutcome {
    fn from(result: Result<SessionStatus, OracleError>) -> Self {
        match result {
            Ok(SessionStatus::Active { remaining_secs }) => PollOutcome::Active { remaining_secs },
            Ok(SessionStatus::LoggedOut) => PollOutcome::LoggedOut,
            Ok(SessionStatus::Rejected { status }) => PollOutcome::Rejected { status },
            Err(e) => {
                error!(error = %e, "Error checking session status");
                PollOutcome::Unreachable
            }
        }
    }
}

/// `M:SS` label for the warning countdown.
pub fn format_countdown(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Warning/expiry state machine for the authenticated session.
#[derive(Debug, Clone)]
pub struct SessionMonitor<C: Clock> {
    config: SessionConfig,
    clock: C,
    phase: SessionPhase,
    warning_shown: bool,
    last_refresh: DateTime<Utc>,
    last_remaining: Option<u64>,
}

impl<C: Clock> SessionMonitor<C> {
    pub fn new(config: SessionConfig, clock: C) -> Self {
        let last_refresh = clock.now();
        Self {
            config,
            clock,
            phase: SessionPhase::Active,
            warning_shown: false,
            last_refresh,
            last_remaining: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_expired(&self) -> bool {
        self.phase == SessionPhase::Expired
    }

    pub fn warning_shown(&self) -> bool {
        self.warning_shown
    }

    /// Remaining seconds from the last successful poll.
    pub fn last_remaining(&self) -> Option<u64> {
        self.last_remaining
    }

    pub fn last_refresh(&self) -> DateTime<Utc> {
        self.last_refresh
    }

    /// Apply one status check.
    pub fn apply_poll(&mut self, outcome: PollOutcome) -> Vec<SessionEvent> {
        if self.is_expired() {
            return Vec::new();
        }
        let remaining = match outcome {
            PollOutcome::Unreachable => return Vec::new(),
            PollOutcome::LoggedOut => {
                info!("Server reports user logged out");
                return self.expire().into_iter().collect();
            }
            PollOutcome::Rejected { status } => {
                info!(status, "Session status rejected");
                return self.expire().into_iter().collect();
            }
            PollOutcome::Active { remaining_secs } => remaining_secs,
        };

        self.last_remaining = Some(remaining);
        let countdown = format_countdown(remaining);
        let within_warning = remaining <= self.config.warning_threshold_secs;
        debug!(remaining_secs = remaining, "Session status checked");

        if within_warning && !self.warning_shown {
            self.warning_shown = true;
            vec![SessionEvent::WarningShown {
                remaining_secs: remaining,
                countdown,
            }]
        } else if !within_warning && self.warning_shown {
            self.warning_shown = false;
            vec![SessionEvent::WarningHidden]
        } else if self.warning_shown {
            vec![SessionEvent::CountdownUpdated {
                remaining_secs: remaining,
                countdown,
            }]
        } else {
            Vec::new()
        }
    }

    /// Throttled background refresh: returns `RefreshDue` at most once per
    /// refresh interval.
    pub fn record_activity(&mut self, kind: ActivityKind) -> Option<SessionEvent> {
        if self.is_expired() {
            return None;
        }
        let now = self.clock.now();
        let interval = Duration::seconds(self.config.activity_refresh_secs as i64);
        if now - self.last_refresh > interval {
            debug!(?kind, "Activity refresh due");
            self.last_refresh = now;
            Some(SessionEvent::RefreshDue)
        } else {
            None
        }
    }

    /// Outcome of an explicit extend request.
    pub fn extend_completed(&mut self, succeeded: bool) -> Vec<SessionEvent> {
        if self.is_expired() {
            return Vec::new();
        }
        if !succeeded {
            return vec![SessionEvent::ExtendFailed];
        }
        self.last_refresh = self.clock.now();
        let mut events = Vec::new();
        if self.warning_shown {
            self.warning_shown = false;
            events.push(SessionEvent::WarningHidden);
        }
        events.push(SessionEvent::Extended);
        events
    }

    /// Enter `Expired`; `None` if already there.
    pub fn expire(&mut self) -> Option<SessionEvent> {
        if self.is_expired() {
            return None;
        }
        self.phase = SessionPhase::Expired;
        info!("Session expired");
        Some(SessionEvent::Expired)
    }
}
