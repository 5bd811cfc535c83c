//! Shared fakes for the async driver tests.
//!
//! `FakeOracle` answers from scripts and counts calls; `RecordingSurface`
//! implements both UI hook traits and keeps every call in order.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use evalguard_core::error::OracleError;
use evalguard_core::oracle::{SessionStatus, StartOutcome, TimeCheck, TimeOracle};
use evalguard_core::session::SessionSurface;
use evalguard_core::surface::{Navigation, Notice, TerminalNotice};
use evalguard_core::timer::{EvaluationSurface, TimerDisplay};

fn scripted_failure(endpoint: &str) -> OracleError {
    OracleError::Malformed {
        endpoint: endpoint.to_string(),
        message: "scripted failure".to_string(),
    }
}

/// One scripted answer; `None` simulates a transport failure.
pub type Scripted<T> = Option<T>;

pub struct FakeOracle {
    start: Mutex<Scripted<StartOutcome>>,
    checks: Mutex<VecDeque<Scripted<TimeCheck>>>,
    default_check: Mutex<Scripted<TimeCheck>>,
    check_delay: Mutex<Duration>,
    statuses: Mutex<VecDeque<Scripted<SessionStatus>>>,
    default_status: Mutex<Scripted<SessionStatus>>,
    mark_expired_fails: AtomicBool,
    refresh_fails: AtomicBool,
    pub start_calls: AtomicUsize,
    pub check_calls: AtomicUsize,
    pub mark_expired_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

impl Default for FakeOracle {
    fn default() -> Self {
        Self {
            start: Mutex::new(None),
            checks: Mutex::new(VecDeque::new()),
            default_check: Mutex::new(None),
            check_delay: Mutex::new(Duration::ZERO),
            statuses: Mutex::new(VecDeque::new()),
            default_status: Mutex::new(Some(SessionStatus::Active {
                remaining_secs: 3000,
            })),
            mark_expired_fails: AtomicBool::new(false),
            refresh_fails: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
            mark_expired_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(self, outcome: StartOutcome) -> Self {
        *self.start.lock().unwrap() = Some(outcome);
        self
    }

    /// Answer every time check not covered by `push_check` with `check`.
    pub fn with_default_check(self, check: Scripted<TimeCheck>) -> Self {
        *self.default_check.lock().unwrap() = check;
        self
    }

    pub fn push_check(&self, check: Scripted<TimeCheck>) {
        self.checks.lock().unwrap().push_back(check);
    }

    /// Make every time check take `delay` of (tokio) time.
    pub fn with_check_delay(self, delay: Duration) -> Self {
        *self.check_delay.lock().unwrap() = delay;
        self
    }

    pub fn with_default_status(self, status: Scripted<SessionStatus>) -> Self {
        *self.default_status.lock().unwrap() = status;
        self
    }

    pub fn push_status(&self, status: Scripted<SessionStatus>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn failing_mark_expired(self) -> Self {
        self.mark_expired_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_refresh(self) -> Self {
        self.refresh_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl TimeOracle for FakeOracle {
    async fn start_evaluation(&self, _evaluation_id: u64) -> Result<StartOutcome, OracleError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.start.lock().unwrap().clone();
        outcome.ok_or_else(|| scripted_failure("start"))
    }

    async fn check_time(&self, _session_id: &str) -> Result<TimeCheck, OracleError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.check_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let next = self.checks.lock().unwrap().pop_front();
        let answer = match next {
            Some(scripted) => scripted,
            None => *self.default_check.lock().unwrap(),
        };
        answer.ok_or_else(|| scripted_failure("check-time"))
    }

    async fn mark_expired(&self, _session_id: &str) -> Result<(), OracleError> {
        self.mark_expired_calls.fetch_add(1, Ordering::SeqCst);
        if self.mark_expired_fails.load(Ordering::SeqCst) {
            Err(scripted_failure("mark-expired"))
        } else {
            Ok(())
        }
    }

    async fn session_status(&self) -> Result<SessionStatus, OracleError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        let answer = match next {
            Some(scripted) => scripted,
            None => *self.default_status.lock().unwrap(),
        };
        answer.ok_or_else(|| scripted_failure("session-status"))
    }

    async fn refresh_session(&self) -> Result<(), OracleError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.refresh_fails.load(Ordering::SeqCst) {
            Err(scripted_failure("refresh-session"))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Render(u64),
    Notify(String),
    LeaveGuard(bool),
    ClearResponses,
    DisableForm,
    Blocking(String),
    Navigate(String, Navigation),
    ShowWarning(String),
    UpdateCountdown(String),
    HideWarning,
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<Call>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn renders(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Render(secs) => Some(secs),
                _ => None,
            })
            .collect()
    }

    pub fn notified(&self, title: &str) -> bool {
        self.calls()
            .iter()
            .any(|c| matches!(c, Call::Notify(t) if t == title))
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }
}

impl EvaluationSurface for RecordingSurface {
    fn render(&self, display: &TimerDisplay) {
        self.push(Call::Render(display.remaining_secs));
    }

    fn notify(&self, notice: Notice) {
        self.push(Call::Notify(notice.title));
    }

    fn set_leave_guard(&self, prompt: Option<&str>) {
        self.push(Call::LeaveGuard(prompt.is_some()));
    }

    fn clear_responses(&self) {
        self.push(Call::ClearResponses);
    }

    fn disable_form(&self) {
        self.push(Call::DisableForm);
    }

    async fn present_blocking(&self, notice: TerminalNotice) {
        self.push(Call::Blocking(notice.title));
    }

    fn navigate(&self, path: &str, mode: Navigation) {
        self.push(Call::Navigate(path.to_string(), mode));
    }
}

impl SessionSurface for RecordingSurface {
    fn show_warning(&self, countdown: &str) {
        self.push(Call::ShowWarning(countdown.to_string()));
    }

    fn update_countdown(&self, countdown: &str) {
        self.push(Call::UpdateCountdown(countdown.to_string()));
    }

    fn hide_warning(&self) {
        self.push(Call::HideWarning);
    }

    fn notify(&self, notice: Notice) {
        self.push(Call::Notify(notice.title));
    }

    async fn present_blocking(&self, notice: TerminalNotice) {
        self.push(Call::Blocking(notice.title));
    }

    fn navigate(&self, path: &str, mode: Navigation) {
        self.push(Call::Navigate(path.to_string(), mode));
    }
}

/// Let spawned tasks run without moving paused time meaningfully.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
