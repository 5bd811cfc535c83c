//! Evaluation countdown engine.
//!
//! The engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` once a
//! second and `reconcile()` whenever the server oracle answers.
//! [`spawn_evaluation_timer`](super::spawn_evaluation_timer) does both on tokio.
//!
//! ## State Transitions
//!
//! ```text
//! Running -> Expired
//! ```
//!
//! `Expired` is terminal. Warning latches only ever go from unset to set.
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = EvaluationTimer::resume("abc", start, 30.0, SystemClock, store)?;
//! // Every second:
//! for event in timer.tick() { /* render, warn, or run the expiry sequence */ }
//! // Whenever the server answers a time check:
//! for event in timer.reconcile(&check) { /* ... */ }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::display::{format_mm_ss, TimeBand, TimerDisplay};
use super::record::{TimerRecord, TimerStore};
use crate::clock::Clock;
use crate::error::{Result, StoreError, ValidationError};
use crate::events::{ExpiryCause, TimerEvent, WarningKind};
use crate::oracle::{TimeCheck, TimeStatus};
use crate::storage::EvaluationConfig;

/// Message shown by the native confirm-leave prompt.
pub const LEAVE_PROMPT: &str = "Your evaluation is in progress. Are you sure you want to leave?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Running,
    Expired,
}

/// Thresholds the engine evaluates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerThresholds {
    pub warning_secs: u64,
    pub final_warning_secs: u64,
    pub drift_tolerance_secs: u64,
}

impl Default for TimerThresholds {
    fn default() -> Self {
        Self {
            warning_secs: 300,
            final_warning_secs: 60,
            drift_tolerance_secs: 5,
        }
    }
}

impl From<&EvaluationConfig> for TimerThresholds {
    fn from(cfg: &EvaluationConfig) -> Self {
        Self {
            warning_secs: cfg.warning_threshold_secs,
            final_warning_secs: cfg.final_warning_threshold_secs,
            drift_tolerance_secs: cfg.drift_tolerance_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WarningLatches {
    five_minute: bool,
    one_minute: bool,
}

/// Countdown for a single in-progress evaluation attempt.
pub struct EvaluationTimer<C: Clock, S: TimerStore> {
    record: TimerRecord,
    phase: TimerPhase,
    latches: WarningLatches,
    thresholds: TimerThresholds,
    clock: C,
    store: S,
}

impl<C: Clock, S: TimerStore> EvaluationTimer<C, S> {
    /// Build the countdown for `session_id`, resuming a persisted record for
    /// the same session if one exists, and persist the result.
    ///
    /// A persisted record for another session, or one that cannot be decoded,
    /// is ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank session id or a time limit that
    /// is not strictly positive.
    pub fn resume(
        session_id: impl Into<String>,
        start_time: DateTime<Utc>,
        time_limit_minutes: f64,
        clock: C,
        store: S,
    ) -> Result<Self> {
        let session_id = session_id.into();
        if session_id.trim().is_empty() {
            return Err(ValidationError::EmptySessionId.into());
        }
        if !time_limit_minutes.is_finite() || time_limit_minutes <= 0.0 {
            return Err(ValidationError::NonPositiveTimeLimit {
                minutes: time_limit_minutes,
            }
            .into());
        }
        let time_limit_secs = ((time_limit_minutes * 60.0).round() as u64).max(1);

        let fresh = TimerRecord {
            session_id,
            start_time,
            time_limit_secs,
        };
        let record = match store.load() {
            Ok(Some(stored)) if stored.session_id == fresh.session_id => {
                info!(session_id = %stored.session_id, "Timer restored from persisted state");
                stored
            }
            Ok(Some(stored)) => {
                debug!(
                    stale = %stored.session_id,
                    current = %fresh.session_id,
                    "Ignoring persisted timer of another session"
                );
                fresh
            }
            Ok(None) => fresh,
            Err(e) => {
                warn!(error = %e, "Failed to restore timer, starting from server values");
                fresh
            }
        };

        let timer = Self {
            record,
            phase: TimerPhase::Running,
            latches: WarningLatches::default(),
            thresholds: TimerThresholds::default(),
            clock,
            store,
        };
        timer.persist();
        Ok(timer)
    }

    pub fn with_thresholds(mut self, thresholds: TimerThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_id(&self) -> &str {
        &self.record.session_id
    }

    pub fn record(&self) -> &TimerRecord {
        &self.record
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_expired(&self) -> bool {
        self.phase == TimerPhase::Expired
    }

    pub fn thresholds(&self) -> TimerThresholds {
        self.thresholds
    }

    pub fn remaining_secs(&self) -> u64 {
        self.record.remaining_secs_at(self.clock.now())
    }

    /// 0.0 .. 100.0 share of the budget still left.
    pub fn progress_pct(&self) -> f64 {
        Self::pct(self.remaining_secs(), self.record.time_limit_secs)
    }

    pub fn display(&self) -> TimerDisplay {
        self.display_for(self.remaining_secs())
    }

    /// Whether leaving the page must be confirmed.
    pub fn leave_guard_active(&self) -> bool {
        self.phase == TimerPhase::Running && self.remaining_secs() > 0
    }

    pub fn leave_prompt(&self) -> Option<&'static str> {
        self.leave_guard_active().then_some(LEAVE_PROMPT)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Call once a second. Renders, raises one-shot warnings and detects
    /// the local zero crossing.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if self.is_expired() {
            return Vec::new();
        }
        let remaining = self.remaining_secs();
        let mut events = vec![TimerEvent::Display(self.display_for(remaining))];
        if remaining == 0 {
            events.extend(self.expire(ExpiryCause::Countdown));
        } else if let Some(kind) = self.check_warnings(remaining) {
            events.push(TimerEvent::Warning {
                kind,
                remaining_secs: remaining,
            });
        }
        events
    }

    /// Apply a server time check.
    ///
    /// An `expired` verdict ends the countdown regardless of local time.
    /// Otherwise, a disagreement beyond the drift tolerance rebases the start
    /// time on the server's elapsed time, persists it and re-renders.
    pub fn reconcile(&mut self, check: &TimeCheck) -> Vec<TimerEvent> {
        if self.is_expired() {
            return Vec::new();
        }
        if check.status == TimeStatus::Expired {
            info!(session_id = %self.record.session_id, "Server reports evaluation expired");
            return self.expire(ExpiryCause::Server).into_iter().collect();
        }

        let client_secs = self.remaining_secs();
        let server_secs = check.remaining_seconds;
        if client_secs.abs_diff(server_secs) <= self.thresholds.drift_tolerance_secs {
            debug!(client_secs, server_secs, "Timer in sync with server");
            return Vec::new();
        }

        warn!(
            session_id = %self.record.session_id,
            client_secs,
            server_secs,
            "Time mismatch detected, syncing with server"
        );
        let now = self.clock.now();
        let elapsed = check.elapsed_seconds.min(i32::MAX as u64) as i64;
        self.record.start_time = now - Duration::seconds(elapsed);
        self.persist();

        let mut events = vec![TimerEvent::Resynced {
            client_secs,
            server_secs,
            at: now,
        }];
        events.extend(self.tick());
        events
    }

    /// Enter `Expired`. Returns `None` if already expired, so concurrent
    /// triggers collapse into a single terminal sequence.
    pub fn expire(&mut self, cause: ExpiryCause) -> Option<TimerEvent> {
        if self.is_expired() {
            return None;
        }
        self.phase = TimerPhase::Expired;
        info!(session_id = %self.record.session_id, ?cause, "Evaluation time expired");
        Some(TimerEvent::Expired {
            cause,
            at: self.clock.now(),
        })
    }

    /// Drop the persisted record once the terminal sequence has run.
    pub fn finish_expiry(&self) -> std::result::Result<(), StoreError> {
        self.store.clear()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.record) {
            warn!(error = %e, "Failed to persist timer state");
        }
    }

    fn display_for(&self, remaining: u64) -> TimerDisplay {
        let band = TimeBand::classify(
            remaining,
            self.thresholds.warning_secs,
            self.thresholds.final_warning_secs,
        );
        let text = if band == TimeBand::Expired {
            "EXPIRED".to_string()
        } else {
            format_mm_ss(remaining)
        };
        TimerDisplay {
            remaining_secs: remaining,
            text,
            band,
            progress_pct: Self::pct(remaining, self.record.time_limit_secs),
        }
    }

    /// Level check on the first observation at or below each threshold, so
    /// a skipped tick cannot swallow a warning. When one observation is past
    /// both thresholds only the one-minute notice fires.
    fn check_warnings(&mut self, remaining: u64) -> Option<WarningKind> {
        if remaining <= self.thresholds.final_warning_secs && !self.latches.one_minute {
            self.latches.one_minute = true;
            self.latches.five_minute = true;
            return Some(WarningKind::OneMinute);
        }
        if remaining <= self.thresholds.warning_secs && !self.latches.five_minute {
            self.latches.five_minute = true;
            return Some(WarningKind::FiveMinutes);
        }
        None
    }

    fn pct(remaining: u64, limit: u64) -> f64 {
        if limit == 0 {
            return 0.0;
        }
        (remaining as f64 / limit as f64 * 100.0).min(100.0)
    }
}
