//! Server time oracle.
//!
//! The portal backend is the authority on how much time an evaluation attempt
//! or a login session has left. Both engines talk to it through [`TimeOracle`];
//! [`HttpOracle`] is the production implementation.

mod http;

pub use http::HttpOracle;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// Server verdict on an evaluation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeStatus {
    Ok,
    Expired,
}

/// Answer of the time-check endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCheck {
    pub status: TimeStatus,
    pub remaining_seconds: u64,
    pub elapsed_seconds: u64,
}

impl TimeCheck {
    pub fn ok(remaining_seconds: u64, elapsed_seconds: u64) -> Self {
        Self {
            status: TimeStatus::Ok,
            remaining_seconds,
            elapsed_seconds,
        }
    }

    pub fn expired() -> Self {
        Self {
            status: TimeStatus::Expired,
            remaining_seconds: 0,
            elapsed_seconds: 0,
        }
    }
}

/// A started or resumed evaluation attempt with a time limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionGrant {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub time_limit_minutes: f64,
    pub resumed: bool,
}

/// Answer of the start-evaluation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    Started(SessionGrant),
    /// The evaluation has no time limit; no countdown applies.
    Untimed { message: Option<String> },
    /// A previous attempt already ran out of time.
    AlreadyExpired,
    Failed { message: String },
}

/// Answer of the session-status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Active { remaining_secs: u64 },
    LoggedOut,
    /// Non-success HTTP status: not authenticated.
    Rejected { status: u16 },
}

/// Authoritative backend for remaining time.
///
/// Futures are `Send` so drivers can run calls as independent tasks while
/// the local countdown keeps ticking.
pub trait TimeOracle: Send + Sync + 'static {
    fn start_evaluation(
        &self,
        evaluation_id: u64,
    ) -> impl Future<Output = Result<StartOutcome, OracleError>> + Send;

    fn check_time(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<TimeCheck, OracleError>> + Send;

    /// Fire-once terminal report. Duplicates are harmless server-side.
    fn mark_expired(&self, session_id: &str)
        -> impl Future<Output = Result<(), OracleError>> + Send;

    fn session_status(&self) -> impl Future<Output = Result<SessionStatus, OracleError>> + Send;

    fn refresh_session(&self) -> impl Future<Output = Result<(), OracleError>> + Send;
}
