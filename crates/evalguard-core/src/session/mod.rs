//! Authenticated-session timeout handling.
//!
//! - [`SessionMonitor`]: server-driven warning/expiry state machine
//! - [`spawn_session_monitor`]: polling driver bound to a [`SessionSurface`]
//! - [`ContextMarkers`]: per-context login markers and the back-navigation guard

mod markers;
mod monitor;
mod runner;

pub use markers::{
    dashboard_for, BackNavigation, ContextMarkers, MemoryMarkers, LAST_PAGE_KEY, LOGGED_IN_KEY,
    SESSION_EXPIRED_KEY,
};
pub use monitor::{format_countdown, ActivityKind, PollOutcome, SessionMonitor, SessionPhase};
pub use runner::{
    spawn_session_monitor, SessionCommand, SessionExit, SessionMonitorHandle, SessionRunSettings,
    SessionSurface,
};
