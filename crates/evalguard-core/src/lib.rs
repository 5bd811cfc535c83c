//! # EvalGuard Core Library
//!
//! Client-side time enforcement for a student evaluation portal: a
//! server-reconciled evaluation countdown and an inactivity timeout for the
//! authenticated session. The `evalguard` CLI is a thin layer over the same
//! library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()`; the server remains authoritative and
//!   periodic reconciliation rebases the local start time when they drift
//! - **Session Monitor**: warning and forced-logout handling driven entirely by
//!   server status checks
//! - **Oracle**: the portal's HTTP endpoints behind the [`TimeOracle`] trait
//! - **Storage**: JSON timer persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`EvaluationTimer`]: countdown state machine
//! - [`spawn_evaluation_timer`] / [`EvaluationLauncher`]: tokio drivers
//! - [`SessionMonitor`] / [`spawn_session_monitor`]: session timeout
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod oracle;
pub mod session;
pub mod storage;
pub mod surface;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use error::{ConfigError, CoreError, OracleError, Result, StoreError, ValidationError};
pub use events::{ExpiryCause, SessionEvent, TimerEvent, WarningKind};
pub use oracle::{HttpOracle, SessionGrant, SessionStatus, StartOutcome, TimeCheck, TimeOracle};
pub use session::{
    spawn_session_monitor, ContextMarkers, MemoryMarkers, SessionMonitor, SessionMonitorHandle,
    SessionSurface,
};
pub use storage::Config;
pub use surface::{Navigation, Notice, NoticeLevel, TerminalNotice};
pub use timer::{
    spawn_evaluation_timer, EvaluationLauncher, EvaluationSurface, EvaluationTimer,
    EvaluationTimerHandle, FileTimerStore, LaunchOutcome, MemoryTimerStore, TimerDisplay,
    TimerRecord, TimerStore,
};
