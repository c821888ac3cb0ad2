// src/config/validate.rs

use crate::config::model::{
    ConfigFile, DEFAULT_RESTART_DELAY, RawConfigFile, TaskConfig, TaskDescriptor, parse_duration,
};
use crate::errors::{ProcwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ProcwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;

        let mut tasks = Vec::with_capacity(raw.task.len());
        for (name, task) in raw.task.iter() {
            tasks.push(resolve_task(name, task)?);
        }

        Ok(ConfigFile::new_unchecked(tasks))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(ProcwatchError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn resolve_task(name: &str, cfg: &TaskConfig) -> Result<TaskDescriptor> {
    if name.trim().is_empty() {
        return Err(ProcwatchError::ConfigError(
            "task name must not be empty".to_string(),
        ));
    }

    if cfg.cmd.trim().is_empty() {
        return Err(ProcwatchError::ConfigError(format!(
            "task '{name}': cmd must not be empty"
        )));
    }

    let restart_delay = match cfg.restart_delay.as_deref() {
        None => DEFAULT_RESTART_DELAY,
        Some(s) => {
            let parsed = parse_duration(s).map_err(|err| {
                ProcwatchError::ConfigError(format!("task '{name}': invalid restart_delay: {err}"))
            })?;
            if parsed.is_zero() {
                DEFAULT_RESTART_DELAY
            } else {
                parsed
            }
        }
    };

    Ok(TaskDescriptor {
        name: name.to_string(),
        command: cfg.cmd.clone(),
        paths: cfg.paths.clone(),
        restart_on_exit: cfg.restart_on_exit,
        restart_delay,
    })
}
