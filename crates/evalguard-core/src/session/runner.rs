//! tokio driver for [`SessionMonitor`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::markers::ContextMarkers;
use super::monitor::{ActivityKind, PollOutcome, SessionMonitor};
use crate::clock::Clock;
use crate::error::OracleError;
use crate::events::SessionEvent;
use crate::oracle::{SessionStatus, TimeOracle};
use crate::storage::Config;
use crate::surface::{Navigation, Notice, TerminalNotice};

/// UI hooks of the session warning dialog.
pub trait SessionSurface: Send + Sync + 'static {
    fn show_warning(&self, countdown: &str);

    fn update_countdown(&self, countdown: &str);

    fn hide_warning(&self);

    fn notify(&self, notice: Notice);

    /// Resolves once the user acknowledged the notice.
    fn present_blocking(&self, notice: TerminalNotice) -> impl Future<Output = ()> + Send;

    fn navigate(&self, path: &str, mode: Navigation);
}

#[derive(Debug, Clone)]
pub struct SessionRunSettings {
    pub poll_interval: Duration,
    pub login_path: String,
    pub logout_path: String,
}

impl SessionRunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.session.poll_interval(),
            login_path: config.server.login_path.clone(),
            logout_path: config.server.logout_path.clone(),
        }
    }
}

impl Default for SessionRunSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Input forwarded from the page to the monitor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Activity(ActivityKind),
    /// The page became visible again; check immediately.
    VisibilityRestored,
    /// "Stay Logged In".
    Extend,
    /// "Logout Now".
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    Stopped,
    Expired,
    LoggedOut,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshKind {
    Background,
    Explicit,
}

/// Owns a running monitor. Dropping the handle cancels the task.
pub struct SessionMonitorHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<SessionExit>,
}

impl SessionMonitorHandle {
    pub fn activity(&self, kind: ActivityKind) {
        self.send(SessionCommand::Activity(kind));
    }

    pub fn visibility_restored(&self) {
        self.send(SessionCommand::VisibilityRestored);
    }

    pub fn extend(&self) {
        self.send(SessionCommand::Extend);
    }

    pub fn logout(&self) {
        self.send(SessionCommand::Logout);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            debug!(?command, "Session monitor already finished");
        }
    }

    pub async fn stop(mut self) -> SessionExit {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        self.join().await
    }

    pub async fn wait(mut self) -> SessionExit {
        self.join().await
    }

    async fn join(&mut self) -> SessionExit {
        match (&mut self.task).await {
            Ok(exit) => exit,
            Err(e) => {
                warn!(error = %e, "Session monitor task ended abnormally");
                SessionExit::Aborted
            }
        }
    }
}

impl Drop for SessionMonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start monitoring on `current_path`.
///
/// Returns `None` on public pages and when the context carries no login
/// marker; nothing is polled in either case.
pub fn spawn_session_monitor<C, O, M, U>(
    monitor: SessionMonitor<C>,
    oracle: Arc<O>,
    markers: Arc<M>,
    surface: Arc<U>,
    settings: SessionRunSettings,
    current_path: &str,
) -> Option<SessionMonitorHandle>
where
    C: Clock,
    O: TimeOracle,
    M: ContextMarkers,
    U: SessionSurface,
{
    if monitor.config().is_public_path(current_path) {
        debug!(path = current_path, "Session timeout: skipping public page");
        return None;
    }
    if !markers.is_logged_in() {
        debug!("Session timeout: user not logged in, skipping");
        return None;
    }

    let (commands, command_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = oneshot::channel();
    let budget = monitor.config().budget_secs;
    let task = tokio::spawn(run(monitor, oracle, markers, surface, settings, command_rx, stop_rx));
    info!(budget_secs = budget, "Session timeout monitoring initialized");
    Some(SessionMonitorHandle {
        commands,
        stop_tx: Some(stop_tx),
        task,
    })
}

async fn run<C, O, M, U>(
    mut monitor: SessionMonitor<C>,
    oracle: Arc<O>,
    markers: Arc<M>,
    surface: Arc<U>,
    settings: SessionRunSettings,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    mut stop_rx: oneshot::Receiver<()>,
) -> SessionExit
where
    C: Clock,
    O: TimeOracle,
    M: ContextMarkers,
    U: SessionSurface,
{
    let mut poll = interval(settings.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polls: JoinSet<Result<SessionStatus, OracleError>> = JoinSet::new();
    let mut refreshes: JoinSet<(RefreshKind, Result<(), OracleError>)> = JoinSet::new();

    loop {
        let events = tokio::select! {
            biased;
            _ = &mut stop_rx => {
                surface.hide_warning();
                info!("Session monitor stopped");
                return SessionExit::Stopped;
            }
            Some(joined) = polls.join_next(), if !polls.is_empty() => match joined {
                Ok(result) => monitor.apply_poll(PollOutcome::from(result)),
                Err(e) => {
                    error!(error = %e, "Session status task failed");
                    Vec::new()
                }
            },
            Some(joined) = refreshes.join_next(), if !refreshes.is_empty() => match joined {
                Ok((RefreshKind::Explicit, result)) => {
                    if let Err(e) = &result {
                        error!(error = %e, "Error extending session");
                    }
                    monitor.extend_completed(result.is_ok())
                }
                Ok((RefreshKind::Background, Err(e))) => {
                    error!(error = %e, "Error refreshing session");
                    Vec::new()
                }
                Ok((RefreshKind::Background, Ok(()))) => Vec::new(),
                Err(e) => {
                    error!(error = %e, "Session refresh task failed");
                    Vec::new()
                }
            },
            Some(command) = command_rx.recv() => match command {
                SessionCommand::Activity(kind) => monitor.record_activity(kind).into_iter().collect(),
                SessionCommand::VisibilityRestored => {
                    spawn_poll(&mut polls, &oracle);
                    Vec::new()
                }
                SessionCommand::Extend => {
                    spawn_refresh(&mut refreshes, &oracle, RefreshKind::Explicit);
                    Vec::new()
                }
                SessionCommand::Logout => {
                    info!("User chose to log out");
                    surface.navigate(&settings.logout_path, Navigation::Assign);
                    return SessionExit::LoggedOut;
                }
            },
            _ = poll.tick() => {
                spawn_poll(&mut polls, &oracle);
                Vec::new()
            }
        };

        for event in events {
            match event {
                SessionEvent::WarningShown { countdown, .. } => surface.show_warning(&countdown),
                SessionEvent::CountdownUpdated { countdown, .. } => {
                    surface.update_countdown(&countdown)
                }
                SessionEvent::WarningHidden => surface.hide_warning(),
                SessionEvent::RefreshDue => {
                    spawn_refresh(&mut refreshes, &oracle, RefreshKind::Background)
                }
                SessionEvent::Extended => surface.notify(Notice::session_extended()),
                SessionEvent::ExtendFailed => surface.notify(Notice::extend_failed()),
                SessionEvent::Expired => {
                    drop(polls);
                    drop(refreshes);
                    markers.record_session_expired();
                    surface
                        .present_blocking(TerminalNotice::session_expired())
                        .await;
                    surface.navigate(&settings.login_path, Navigation::Replace);
                    return SessionExit::Expired;
                }
            }
        }
    }
}

fn spawn_poll<O: TimeOracle>(
    polls: &mut JoinSet<Result<SessionStatus, OracleError>>,
    oracle: &Arc<O>,
) {
    let oracle = Arc::clone(oracle);
    polls.spawn(async move { oracle.session_status().await });
}

fn spawn_refresh<O: TimeOracle>(
    refreshes: &mut JoinSet<(RefreshKind, Result<(), OracleError>)>,
    oracle: &Arc<O>,
    kind: RefreshKind,
) {
    let oracle = Arc::clone(oracle);
    refreshes.spawn(async move { (kind, oracle.refresh_session().await) });
}
