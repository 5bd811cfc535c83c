use std::sync::Arc;

use clap::Subcommand;
use evalguard_core::oracle::TimeOracle;
use evalguard_core::timer::{EvaluationLauncher, FileTimerStore, LaunchOutcome, TimerStore};
use evalguard_core::{Clock, Config, HttpOracle, SystemClock};

use super::{oracle, runtime};
use crate::terminal::TerminalSurface;

#[derive(Subcommand)]
pub enum EvaluationAction {
    /// Start (or resume) an evaluation and run its countdown
    Start {
        /// Evaluation ID
        evaluation_id: u64,
        /// Override the configured portal URL
        #[arg(long)]
        base_url: Option<String>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
        /// Do not wait for Enter on blocking notices
        #[arg(long)]
        no_wait: bool,
    },
    /// Ask the server how much time an attempt has left
    Check {
        /// Evaluation session ID
        session_id: String,
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Print the persisted countdown as JSON
    Status,
    /// Forget the persisted countdown
    Clear,
}

async fn start(
    launcher: EvaluationLauncher<HttpOracle, TerminalSurface>,
    evaluation_id: u64,
    store: FileTimerStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match launcher.launch(evaluation_id, SystemClock, store).await? {
        LaunchOutcome::Timed(handle) => {
            let exit = tokio::select! {
                exit = handle.wait() => exit,
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("interrupted; the countdown resumes on the next start");
                    return Ok(());
                }
            };
            tracing::info!(?exit, "Countdown finished");
            Ok(())
        }
        LaunchOutcome::Failed { message } => Err(message.into()),
        LaunchOutcome::Untimed | LaunchOutcome::AlreadyExpired => Ok(()),
    }
}

pub fn run(action: EvaluationAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        EvaluationAction::Start {
            evaluation_id,
            base_url,
            json,
            no_wait,
        } => {
            let config = Config::load()?;
            let oracle = Arc::new(oracle(&config, base_url.as_deref())?);
            let surface = Arc::new(TerminalSurface::new(!no_wait, json));
            let store = FileTimerStore::open_default()?;
            let launcher = EvaluationLauncher::new(oracle, surface, &config);

            runtime()?.block_on(start(launcher, evaluation_id, store))
        }
        EvaluationAction::Check {
            session_id,
            base_url,
        } => {
            let config = Config::load()?;
            let oracle = oracle(&config, base_url.as_deref())?;
            let check = runtime()?.block_on(oracle.check_time(&session_id))?;
            println!("{}", serde_json::to_string_pretty(&check)?);
            Ok(())
        }
        EvaluationAction::Status => {
            let store = FileTimerStore::open_default()?;
            match store.load()? {
                Some(record) => {
                    let remaining = record.remaining_secs_at(SystemClock.now());
                    let status = serde_json::json!({
                        "session_id": record.session_id,
                        "start_time": record.start_time,
                        "time_limit_secs": record.time_limit_secs,
                        "remaining_secs": remaining,
                    });
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
                None => println!("null"),
            }
            Ok(())
        }
        EvaluationAction::Clear => {
            FileTimerStore::open_default()?.clear()?;
            println!("ok");
            Ok(())
        }
    }
}
