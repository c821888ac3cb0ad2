// src/output.rs

//! Terminal rendering for task output lines.
//!
//! The supervision core only hands `(supervisor, line)` pairs to registered
//! listeners; these are the default listeners `run()` registers. Each task
//! gets a stable color derived from its name, so interleaved output stays
//! readable; stderr lines are always red.

use chrono::Local;
use owo_colors::{AnsiColors, OwoColorize};

use crate::exec::TaskSupervisor;

const TASK_COLORS: [AnsiColors; 6] = [
    AnsiColors::Red,
    AnsiColors::Green,
    AnsiColors::Yellow,
    AnsiColors::Blue,
    AnsiColors::Magenta,
    AnsiColors::Cyan,
];

/// Deterministic color per task name, stable across restarts.
fn task_color(name: &str) -> AnsiColors {
    let total: usize = name.bytes().map(usize::from).sum();
    TASK_COLORS[total % TASK_COLORS.len()]
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

pub fn write_stdout(sup: &TaskSupervisor, line: &str) {
    println!(
        "{} {} > {}",
        timestamp().dimmed(),
        sup.id().color(task_color(sup.name())).bold(),
        line
    );
}

pub fn write_stderr(sup: &TaskSupervisor, line: &str) {
    eprintln!(
        "{} {} > {}",
        timestamp().dimmed(),
        sup.id().color(AnsiColors::Red).bold(),
        line
    );
}
