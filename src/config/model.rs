// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [task.web]
/// cmd = "npm run dev"
/// paths = ["src/**/*.ts", "package.json"]
/// restart_on_exit = true
/// restart_delay = "2s"
///
/// [task.docs]
/// cmd = "make docs"
/// paths = ["*.md"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// All tasks from `[task.<name>]`. Keys are the task names.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// The command to execute (run through `sh -c`).
    pub cmd: String,

    /// Glob patterns, relative to the watched root, whose changes reload
    /// this task. Empty means the task is never reloaded by file activity.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Restart the process automatically when it exits on its own.
    #[serde(default)]
    pub restart_on_exit: bool,

    /// Duration string like `"250ms"`, `"2s"`, `"1m"`.
    ///
    /// Used both as the reload debounce window and as the throttle between
    /// exit-triggered restarts. Defaults to one second when missing or zero.
    #[serde(default)]
    pub restart_delay: Option<String>,
}

/// Validated configuration: every task resolved into a descriptor.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub tasks: Vec<TaskDescriptor>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(tasks: Vec<TaskDescriptor>) -> Self {
        Self { tasks }
    }
}

/// One task as consumed by the supervision core. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub name: String,
    pub command: String,
    pub paths: Vec<String>,
    pub restart_on_exit: bool,
    pub restart_delay: Duration,
}

pub(crate) const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
