//! Terminal rendition of the countdown and session dialogs.

use std::io::{BufRead, Write};

use evalguard_core::session::SessionSurface;
use evalguard_core::surface::{Navigation, Notice, NoticeLevel, TerminalNotice};
use evalguard_core::timer::{EvaluationSurface, TimeBand, TimerDisplay};
use tracing::{debug, info};

/// Prints every hook to stdout. Blocking notices wait for Enter unless
/// `interactive` is off.
#[derive(Debug, Clone, Copy)]
pub struct TerminalSurface {
    interactive: bool,
    json: bool,
}

impl TerminalSurface {
    pub fn new(interactive: bool, json: bool) -> Self {
        Self { interactive, json }
    }

    fn print_notice(&self, notice: &Notice) {
        if self.json {
            if let Ok(line) = serde_json::to_string(notice) {
                println!("{line}");
            }
            return;
        }
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "alert",
        };
        if notice.text.is_empty() {
            println!("[{tag}] {}", notice.title);
        } else {
            println!("[{tag}] {}: {}", notice.title, notice.text);
        }
    }

    async fn block_on_ack(&self, notice: TerminalNotice) {
        if self.json {
            if let Ok(line) = serde_json::to_string(&notice) {
                println!("{line}");
            }
        } else {
            println!();
            println!("== {} ==", notice.title);
            println!("{}", notice.body);
        }
        if !self.interactive {
            return;
        }
        print!("Press Enter to {}... ", notice.confirm_label);
        let _ = std::io::stdout().flush();
        let read = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| ())
        })
        .await;
        if let Ok(Err(e)) = read {
            debug!(error = %e, "Could not read acknowledgement");
        }
    }

    fn print_navigation(&self, path: &str, mode: Navigation) {
        if self.json {
            println!(
                "{}",
                serde_json::json!({ "type": "navigate", "path": path, "mode": mode })
            );
        } else {
            let verb = match mode {
                Navigation::Assign => "open",
                Navigation::Replace => "replace with",
            };
            println!("-> {verb} {path}");
        }
    }
}

impl EvaluationSurface for TerminalSurface {
    fn render(&self, display: &TimerDisplay) {
        if self.json {
            if let Ok(line) = serde_json::to_string(display) {
                println!("{line}");
            }
            return;
        }
        let marker = match display.band {
            TimeBand::Normal => "",
            TimeBand::Warning => " (warning)",
            TimeBand::Critical => " (critical)",
            TimeBand::Expired => "",
        };
        println!("{}  {:5.1}%{marker}", display.text, display.progress_pct);
    }

    fn notify(&self, notice: Notice) {
        self.print_notice(&notice);
    }

    fn set_leave_guard(&self, prompt: Option<&str>) {
        match prompt {
            Some(prompt) => debug!(prompt, "Leave guard installed"),
            None => debug!("Leave guard removed"),
        }
    }

    fn clear_responses(&self) {
        info!("Responses discarded");
    }

    fn disable_form(&self) {
        info!("Evaluation form disabled");
    }

    async fn present_blocking(&self, notice: TerminalNotice) {
        self.block_on_ack(notice).await;
    }

    fn navigate(&self, path: &str, mode: Navigation) {
        self.print_navigation(path, mode);
    }
}

impl SessionSurface for TerminalSurface {
    fn show_warning(&self, countdown: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "type": "warning_shown", "countdown": countdown }));
        } else {
            println!(
                "Session expiring soon: {countdown} left. Type 'extend' to stay logged in or 'logout' to leave."
            );
        }
    }

    fn update_countdown(&self, countdown: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "type": "countdown", "countdown": countdown }));
        } else {
            println!("Session expires in {countdown}");
        }
    }

    fn hide_warning(&self) {
        if self.json {
            println!("{}", serde_json::json!({ "type": "warning_hidden" }));
        } else {
            println!("Session warning dismissed");
        }
    }

    fn notify(&self, notice: Notice) {
        self.print_notice(&notice);
    }

    async fn present_blocking(&self, notice: TerminalNotice) {
        self.block_on_ack(notice).await;
    }

    fn navigate(&self, path: &str, mode: Navigation) {
        self.print_navigation(path, mode);
    }
}
