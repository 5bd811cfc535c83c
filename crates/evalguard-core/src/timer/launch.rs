use std::sync::Arc;

use tracing::{error, info};

use super::engine::{EvaluationTimer, TimerThresholds};
use super::record::TimerStore;
use super::runner::{spawn_evaluation_timer, EvaluationSurface, EvaluationTimerHandle, TimerRunSettings};
use crate::clock::Clock;
use crate::error::Result;
use crate::oracle::{StartOutcome, TimeOracle};
use crate::storage::Config;
use crate::surface::{Navigation, Notice, TerminalNotice};

const START_FAILED: &str = "Failed to start evaluation. Please try again.";

/// Result of asking the portal to start an evaluation.
pub enum LaunchOutcome {
    /// A countdown is running.
    Timed(EvaluationTimerHandle),
    /// The evaluation has no time limit; no countdown was created.
    Untimed,
    /// A previous attempt already expired; the user was sent to the landing page.
    AlreadyExpired,
    Failed { message: String },
}

impl std::fmt::Debug for LaunchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchOutcome::Timed(handle) => f
                .debug_tuple("Timed")
                .field(&handle.session_id())
                .finish(),
            LaunchOutcome::Untimed => f.write_str("Untimed"),
            LaunchOutcome::AlreadyExpired => f.write_str("AlreadyExpired"),
            LaunchOutcome::Failed { message } => {
                f.debug_struct("Failed").field("message", message).finish()
            }
        }
    }
}

/// Starts evaluations and wires their countdowns to a surface.
pub struct EvaluationLauncher<O, U> {
    oracle: Arc<O>,
    surface: Arc<U>,
    settings: TimerRunSettings,
    thresholds: TimerThresholds,
}

impl<O: TimeOracle, U: EvaluationSurface> EvaluationLauncher<O, U> {
    pub fn new(oracle: Arc<O>, surface: Arc<U>, config: &Config) -> Self {
        Self {
            oracle,
            surface,
            settings: TimerRunSettings::from_config(config),
            thresholds: TimerThresholds::from(&config.evaluation),
        }
    }

    pub fn with_settings(mut self, settings: TimerRunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Start or resume `evaluation_id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the portal grants a session with an
    /// unusable time limit or session id. Every other failure is reported to
    /// the surface and returned as [`LaunchOutcome::Failed`].
    pub async fn launch<C: Clock, S: TimerStore>(
        &self,
        evaluation_id: u64,
        clock: C,
        store: S,
    ) -> Result<LaunchOutcome> {
        let outcome = match self.oracle.start_evaluation(evaluation_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(evaluation_id, error = %e, "Failed to start evaluation");
                self.surface
                    .present_blocking(TerminalNotice::start_failed(START_FAILED))
                    .await;
                return Ok(LaunchOutcome::Failed {
                    message: START_FAILED.to_string(),
                });
            }
        };

        match outcome {
            StartOutcome::Started(grant) => {
                let timer = EvaluationTimer::resume(
                    grant.session_id,
                    grant.start_time,
                    grant.time_limit_minutes,
                    clock,
                    store,
                )?
                .with_thresholds(self.thresholds);
                let handle = spawn_evaluation_timer(
                    timer,
                    Arc::clone(&self.oracle),
                    Arc::clone(&self.surface),
                    self.settings.clone(),
                );
                if grant.resumed {
                    self.surface.notify(Notice::session_resumed());
                }
                Ok(LaunchOutcome::Timed(handle))
            }
            StartOutcome::Untimed { message } => {
                info!(evaluation_id, "Evaluation has no time limit");
                self.surface.notify(Notice::no_time_limit(message.as_deref()));
                Ok(LaunchOutcome::Untimed)
            }
            StartOutcome::AlreadyExpired => {
                info!(evaluation_id, "Previous evaluation session expired");
                self.surface
                    .present_blocking(TerminalNotice::previous_attempt_expired())
                    .await;
                self.surface
                    .navigate(&self.settings.landing_path, Navigation::Assign);
                Ok(LaunchOutcome::AlreadyExpired)
            }
            StartOutcome::Failed { message } => {
                self.surface
                    .present_blocking(TerminalNotice::start_failed(&message))
                    .await;
                Ok(LaunchOutcome::Failed { message })
            }
        }
    }
}
