use std::io::BufRead;
use std::sync::Arc;

use clap::Subcommand;
use evalguard_core::oracle::TimeOracle;
use evalguard_core::session::{
    spawn_session_monitor, ActivityKind, ContextMarkers, MemoryMarkers, SessionCommand,
    SessionMonitor, SessionRunSettings,
};
use evalguard_core::{Config, SystemClock};
use tokio::sync::mpsc;

use super::{oracle, runtime};
use crate::terminal::TerminalSurface;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Monitor the login session until it expires or you log out
    ///
    /// Reads commands from stdin: `extend`, `logout`, `check`; any other
    /// line counts as activity.
    Watch {
        /// Page the session is considered to be on
        #[arg(long, default_value = "/student/dashboard")]
        path: String,
        #[arg(long)]
        base_url: Option<String>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Print the server's session status once
    Status {
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Ask the server to extend the session
    Refresh {
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn parse_command(line: &str) -> SessionCommand {
    match line.trim() {
        "extend" => SessionCommand::Extend,
        "logout" => SessionCommand::Logout,
        "check" => SessionCommand::VisibilityRestored,
        _ => SessionCommand::Activity(ActivityKind::Key),
    }
}

async fn watch(
    config: Config,
    path: String,
    base_url: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let oracle = Arc::new(oracle(&config, base_url.as_deref())?);
    let markers = Arc::new(MemoryMarkers::new());
    // A configured cookie stands in for the interactive login.
    markers.mark_page_visit(&path, &config.session.public_paths);

    let Some(handle) = spawn_session_monitor(
        SessionMonitor::new(config.session.clone(), SystemClock),
        oracle,
        markers,
        Arc::new(TerminalSurface::new(false, json)),
        SessionRunSettings::from_config(&config),
        &path,
    ) else {
        println!("session monitoring does not apply to {path}");
        return Ok(());
    };

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines().map_while(Result::ok) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut finished_check = tokio::time::interval(std::time::Duration::from_millis(250));
    loop {
        tokio::select! {
            Some(line) = line_rx.recv() => match parse_command(&line) {
                SessionCommand::Activity(kind) => handle.activity(kind),
                SessionCommand::VisibilityRestored => handle.visibility_restored(),
                SessionCommand::Extend => handle.extend(),
                SessionCommand::Logout => handle.logout(),
            },
            _ = finished_check.tick() => {
                if handle.is_finished() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("interrupted");
                return Ok(());
            }
        }
    }
    let exit = handle.wait().await;
    tracing::info!(?exit, "Session monitor finished");
    Ok(())
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Watch {
            path,
            base_url,
            json,
        } => {
            let config = Config::load()?;
            runtime()?.block_on(watch(config, path, base_url, json))
        }
        SessionAction::Status { base_url } => {
            let config = Config::load()?;
            let oracle = oracle(&config, base_url.as_deref())?;
            let status = runtime()?.block_on(oracle.session_status())?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        SessionAction::Refresh { base_url } => {
            let config = Config::load()?;
            let oracle = oracle(&config, base_url.as_deref())?;
            runtime()?.block_on(oracle.refresh_session())?;
            println!("ok");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_lines_map_to_commands() {
        assert_eq!(parse_command("extend\n"), SessionCommand::Extend);
        assert_eq!(parse_command(" logout "), SessionCommand::Logout);
        assert_eq!(parse_command("check"), SessionCommand::VisibilityRestored);
        assert_eq!(
            parse_command(""),
            SessionCommand::Activity(ActivityKind::Key)
        );
    }
}
