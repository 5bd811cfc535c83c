//! Vocabulary shared by the UI hooks of both engines.
//!
//! The engines never render anything themselves. They hand these values to
//! an [`EvaluationSurface`](crate::timer::EvaluationSurface) or a
//! [`SessionSurface`](crate::session::SessionSurface).

use serde::{Deserialize, Serialize};

use crate::events::WarningKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient, non-blocking notice (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn for_warning(kind: WarningKind) -> Self {
        match kind {
            WarningKind::FiveMinutes => Self::new(
                NoticeLevel::Warning,
                "5 Minutes Remaining",
                "You have 5 minutes left to complete this evaluation.",
            ),
            WarningKind::OneMinute => Self::new(
                NoticeLevel::Error,
                "1 Minute Remaining!",
                "Please submit your evaluation soon.",
            ),
        }
    }

    pub fn session_resumed() -> Self {
        Self::new(
            NoticeLevel::Info,
            "Session Resumed",
            "Your previous evaluation session has been resumed.",
        )
    }

    pub fn no_time_limit(message: Option<&str>) -> Self {
        Self::new(
            NoticeLevel::Info,
            "No Time Limit",
            message.unwrap_or("You have unlimited time to complete this evaluation."),
        )
    }

    pub fn session_extended() -> Self {
        Self::new(NoticeLevel::Success, "Session extended successfully!", "")
    }

    pub fn extend_failed() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Failed to extend session. Please try again.",
            "",
        )
    }
}

/// A blocking notice the user must acknowledge before anything continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalNotice {
    pub title: String,
    pub body: String,
    pub confirm_label: String,
}

impl TerminalNotice {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        confirm_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            confirm_label: confirm_label.into(),
        }
    }

    pub fn evaluation_expired() -> Self {
        Self::new(
            "Time Expired",
            "Your evaluation time has expired. Your responses have been discarded. \
             Please contact your instructor if you need to retake this evaluation.",
            "Return to Dashboard",
        )
    }

    pub fn previous_attempt_expired() -> Self {
        Self::new(
            "Session Expired",
            "Your previous evaluation session has expired. Please contact your instructor.",
            "OK",
        )
    }

    pub fn start_failed(message: &str) -> Self {
        Self::new("Error", message, "OK")
    }

    pub fn session_expired() -> Self {
        Self::new(
            "Session Expired",
            "Your session has expired after 1 hour of inactivity. \
             You will be redirected to the login page.",
            "OK",
        )
    }
}

/// How a navigation is recorded in the browsing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Navigation {
    /// Push a new history entry.
    Assign,
    /// Replace the current entry so Back cannot return to it.
    Replace,
}
