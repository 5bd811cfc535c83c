//! Ephemeral per-context markers and the back-navigation guard.
//!
//! Mirrors a browser's per-tab session storage: a "logged in" flag, the last
//! visited authenticated page, and a "session expired" flag that lets the
//! guard send the user back to the login view after a forced logout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const LOGGED_IN_KEY: &str = "is_logged_in";
pub const LAST_PAGE_KEY: &str = "last_page";
pub const SESSION_EXPIRED_KEY: &str = "session_expired";

const ADMIN_DASHBOARD: &str = "/admin/admin-dashboard";
const GUIDANCE_DASHBOARD: &str = "/guidance/guidance-dashboard";
const STUDENT_DASHBOARD: &str = "/student/student-dashboard";

/// Decision of the back-navigation guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackNavigation {
    Allow,
    /// Replace the history entry with this path instead.
    Redirect(String),
}

/// String key/value storage scoped to one browsing context.
pub trait ContextMarkers: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);

    fn is_logged_in(&self) -> bool {
        self.get(LOGGED_IN_KEY).as_deref() == Some("true")
    }

    fn session_expired(&self) -> bool {
        self.get(SESSION_EXPIRED_KEY).as_deref() == Some("true")
    }

    fn last_page(&self) -> Option<String> {
        self.get(LAST_PAGE_KEY)
    }

    /// Record an authenticated page view. Public pages (and the site root)
    /// leave the markers untouched and return `false`.
    fn mark_page_visit(&self, path: &str, public_paths: &[String]) -> bool {
        if path.is_empty() || path == "/" || public_paths.iter().any(|p| path.contains(p.as_str()))
        {
            return false;
        }
        self.set(LOGGED_IN_KEY, "true");
        self.set(LAST_PAGE_KEY, path);
        self.remove(SESSION_EXPIRED_KEY);
        true
    }

    /// Forget the login and flag the forced logout.
    fn record_session_expired(&self) {
        self.remove(LOGGED_IN_KEY);
        self.remove(LAST_PAGE_KEY);
        self.set(SESSION_EXPIRED_KEY, "true");
    }

    /// Block Back from returning a logged-in user to the login/logout views.
    fn guard_back_navigation(&self, path: &str) -> BackNavigation {
        if self.session_expired() || !self.is_logged_in() || !is_auth_view(path) {
            return BackNavigation::Allow;
        }
        let target = self
            .last_page()
            .filter(|last| !is_auth_view(last))
            .unwrap_or_else(|| dashboard_for(path).to_string());
        BackNavigation::Redirect(target)
    }
}

fn is_auth_view(path: &str) -> bool {
    path.contains("/logout") || path.contains("/login")
}

/// Role dashboard for a path.
pub fn dashboard_for(path: &str) -> &'static str {
    if path.contains("/admin/") {
        ADMIN_DASHBOARD
    } else if path.contains("/guidance/") {
        GUIDANCE_DASHBOARD
    } else {
        STUDENT_DASHBOARD
    }
}

/// In-memory markers shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryMarkers {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryMarkers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextMarkers for MemoryMarkers {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SessionConfig;

    fn public() -> Vec<String> {
        SessionConfig::default().public_paths
    }

    #[test]
    fn page_visit_marks_login() {
        let markers = MemoryMarkers::new();
        assert!(markers.mark_page_visit("/student/evaluation/7", &public()));
        assert!(markers.is_logged_in());
        assert_eq!(markers.last_page().as_deref(), Some("/student/evaluation/7"));
    }

    #[test]
    fn public_pages_are_not_recorded() {
        let markers = MemoryMarkers::new();
        assert!(!markers.mark_page_visit("/login", &public()));
        assert!(!markers.mark_page_visit("/", &public()));
        assert!(!markers.is_logged_in());
    }

    #[test]
    fn back_to_login_redirects_to_last_page() {
        let markers = MemoryMarkers::new();
        markers.mark_page_visit("/guidance/reports", &public());
        assert_eq!(
            markers.guard_back_navigation("/login"),
            BackNavigation::Redirect("/guidance/reports".into())
        );
        assert_eq!(
            markers.guard_back_navigation("/guidance/reports"),
            BackNavigation::Allow
        );
    }

    #[test]
    fn back_guard_falls_back_to_role_dashboard() {
        let markers = MemoryMarkers::new();
        markers.set(LOGGED_IN_KEY, "true");
        markers.set(LAST_PAGE_KEY, "/logout");
        assert_eq!(
            markers.guard_back_navigation("/admin/logout"),
            BackNavigation::Redirect(ADMIN_DASHBOARD.into())
        );
    }

    #[test]
    fn expired_session_allows_return_to_login() {
        let markers = MemoryMarkers::new();
        markers.mark_page_visit("/student/dashboard", &public());
        markers.record_session_expired();
        assert!(!markers.is_logged_in());
        assert!(markers.last_page().is_none());
        assert!(markers.session_expired());
        assert_eq!(markers.guard_back_navigation("/login"), BackNavigation::Allow);
    }

    #[test]
    fn new_login_clears_expired_flag() {
        let markers = MemoryMarkers::new();
        markers.record_session_expired();
        markers.mark_page_visit("/student/dashboard", &public());
        assert!(!markers.session_expired());
    }
}
