mod display;
mod engine;
mod launch;
mod record;
mod runner;

pub use display::{format_mm_ss, TimeBand, TimerDisplay};
pub use engine::{EvaluationTimer, TimerPhase, TimerThresholds, LEAVE_PROMPT};
pub use launch::{EvaluationLauncher, LaunchOutcome};
pub use record::{FileTimerStore, MemoryTimerStore, TimerRecord, TimerStore, TIMER_RECORD_FILE};
pub use runner::{
    spawn_evaluation_timer, EvaluationSurface, EvaluationTimerHandle, TimerExit, TimerRunSettings,
};
