//! tokio driver for [`EvaluationTimer`].
//!
//! One task owns the engine and multiplexes a render interval, a slower
//! reconciliation interval and the answers of in-flight time checks. Checks
//! run as separate tasks so a slow oracle never delays a render tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use super::display::TimerDisplay;
use super::engine::{EvaluationTimer, LEAVE_PROMPT};
use super::record::TimerStore;
use crate::clock::Clock;
use crate::error::OracleError;
use crate::events::{ExpiryCause, TimerEvent};
use crate::oracle::{TimeCheck, TimeOracle};
use crate::storage::Config;
use crate::surface::{Navigation, Notice, TerminalNotice};

/// UI hooks the countdown drives. Implementations without a visual surface
/// for some hook simply ignore it.
pub trait EvaluationSurface: Send + Sync + 'static {
    fn render(&self, display: &TimerDisplay);

    fn notify(&self, notice: Notice);

    /// `Some(prompt)` installs the confirm-leave interception, `None` removes it.
    fn set_leave_guard(&self, prompt: Option<&str>);

    /// Irrecoverably discard every in-progress answer.
    fn clear_responses(&self);

    /// Disable all inputs and the submit action.
    fn disable_form(&self);

    /// Resolves once the user acknowledged the notice.
    fn present_blocking(&self, notice: TerminalNotice) -> impl Future<Output = ()> + Send;

    fn navigate(&self, path: &str, mode: Navigation);
}

/// Intervals and targets of a running countdown.
#[derive(Debug, Clone)]
pub struct TimerRunSettings {
    pub tick_interval: Duration,
    pub sync_interval: Duration,
    pub first_sync_delay: Duration,
    pub redirect_delay: Duration,
    pub landing_path: String,
}

impl TimerRunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_interval: config.evaluation.tick_interval(),
            sync_interval: config.evaluation.sync_interval(),
            first_sync_delay: config.evaluation.first_sync_delay(),
            redirect_delay: config.evaluation.redirect_delay(),
            landing_path: config.server.landing_path.clone(),
        }
    }
}

impl Default for TimerRunSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// How a countdown task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerExit {
    Stopped,
    Expired { cause: ExpiryCause, reported: bool },
    /// The task was cancelled or panicked.
    Aborted,
}

/// Owns a running countdown. Dropping the handle cancels the task.
pub struct EvaluationTimerHandle {
    session_id: String,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<TimerExit>,
}

impl EvaluationTimerHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel both periodic tasks and remove the leave guard.
    ///
    /// Once the terminal sequence has begun it runs to completion first.
    pub async fn stop(mut self) -> TimerExit {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        self.join().await
    }

    /// Wait for the countdown to end on its own.
    pub async fn wait(mut self) -> TimerExit {
        self.join().await
    }

    async fn join(&mut self) -> TimerExit {
        match (&mut self.task).await {
            Ok(exit) => exit,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Evaluation timer task ended abnormally");
                TimerExit::Aborted
            }
        }
    }
}

impl Drop for EvaluationTimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start rendering and reconciling `timer` on the current tokio runtime.
pub fn spawn_evaluation_timer<C, S, O, U>(
    timer: EvaluationTimer<C, S>,
    oracle: Arc<O>,
    surface: Arc<U>,
    settings: TimerRunSettings,
) -> EvaluationTimerHandle
where
    C: Clock,
    S: TimerStore,
    O: TimeOracle,
    U: EvaluationSurface,
{
    let (stop_tx, stop_rx) = oneshot::channel();
    let session_id = timer.session_id().to_string();
    let task = tokio::spawn(run(timer, oracle, surface, settings, stop_rx));
    EvaluationTimerHandle {
        session_id,
        stop_tx: Some(stop_tx),
        task,
    }
}

async fn run<C, S, O, U>(
    mut timer: EvaluationTimer<C, S>,
    oracle: Arc<O>,
    surface: Arc<U>,
    settings: TimerRunSettings,
    mut stop_rx: oneshot::Receiver<()>,
) -> TimerExit
where
    C: Clock,
    S: TimerStore,
    O: TimeOracle,
    U: EvaluationSurface,
{
    let session_id = timer.session_id().to_string();
    surface.set_leave_guard(Some(LEAVE_PROMPT));
    info!(
        session_id = %session_id,
        remaining_secs = timer.remaining_secs(),
        "Evaluation timer started"
    );

    let start = Instant::now();
    let mut render = interval_at(start, settings.tick_interval);
    render.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sync = interval_at(start + settings.sync_interval, settings.sync_interval);
    sync.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let first_sync = sleep(settings.first_sync_delay);
    tokio::pin!(first_sync);
    let mut first_sync_pending = true;
    let mut checks: JoinSet<Result<TimeCheck, OracleError>> = JoinSet::new();

    // Server answers are polled before the render tick so a correction is
    // applied before the value is shown.
    let cause = loop {
        let events = tokio::select! {
            biased;
            _ = &mut stop_rx => {
                surface.set_leave_guard(None);
                info!(session_id = %session_id, "Evaluation timer stopped");
                return TimerExit::Stopped;
            }
            Some(joined) = checks.join_next(), if !checks.is_empty() => match joined {
                Ok(Ok(check)) => timer.reconcile(&check),
                Ok(Err(e)) => {
                    error!(session_id = %session_id, error = %e, "Failed to sync with server");
                    Vec::new()
                }
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "Time check task failed");
                    Vec::new()
                }
            },
            () = &mut first_sync, if first_sync_pending => {
                first_sync_pending = false;
                spawn_check(&mut checks, &oracle, &session_id);
                Vec::new()
            }
            _ = sync.tick() => {
                spawn_check(&mut checks, &oracle, &session_id);
                Vec::new()
            }
            _ = render.tick() => timer.tick(),
        };
        if let Some(cause) = dispatch(surface.as_ref(), &events) {
            break cause;
        }
    };

    drop(checks);
    finish_expired(timer, oracle, surface, settings, cause).await
}

fn spawn_check<O: TimeOracle>(
    checks: &mut JoinSet<Result<TimeCheck, OracleError>>,
    oracle: &Arc<O>,
    session_id: &str,
) {
    let oracle = Arc::clone(oracle);
    let session_id = session_id.to_string();
    checks.spawn(async move { oracle.check_time(&session_id).await });
}

/// Forward events to the surface; returns the expiry cause if the countdown ended.
fn dispatch<U: EvaluationSurface>(surface: &U, events: &[TimerEvent]) -> Option<ExpiryCause> {
    let mut expired = None;
    for event in events {
        match event {
            TimerEvent::Display(display) => surface.render(display),
            TimerEvent::Warning { kind, .. } => surface.notify(Notice::for_warning(*kind)),
            TimerEvent::Resynced { .. } => {}
            TimerEvent::Expired { cause, .. } => expired = Some(*cause),
        }
    }
    expired
}

/// Terminal sequence. Runs once per countdown: the engine's expiry latch
/// only ever yields a single `Expired` event.
async fn finish_expired<C, S, O, U>(
    timer: EvaluationTimer<C, S>,
    oracle: Arc<O>,
    surface: Arc<U>,
    settings: TimerRunSettings,
    cause: ExpiryCause,
) -> TimerExit
where
    C: Clock,
    S: TimerStore,
    O: TimeOracle,
    U: EvaluationSurface,
{
    let session_id = timer.session_id().to_string();
    surface.set_leave_guard(None);
    surface.clear_responses();
    surface.disable_form();
    info!(session_id = %session_id, "All responses cleared due to timeout");

    surface
        .present_blocking(TerminalNotice::evaluation_expired())
        .await;

    let reported = match oracle.mark_expired(&session_id).await {
        Ok(()) => {
            info!(session_id = %session_id, "Evaluation marked as expired");
            true
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Failed to mark evaluation as expired");
            false
        }
    };
    if let Err(e) = timer.finish_expiry() {
        warn!(session_id = %session_id, error = %e, "Failed to clear persisted timer");
    }

    sleep(settings.redirect_delay).await;
    surface.navigate(&settings.landing_path, Navigation::Assign);
    TimerExit::Expired { cause, reported }
}
