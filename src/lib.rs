// src/lib.rs

pub mod cli;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod output;
pub mod watch;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate};
use crate::engine::Orchestrator;
use crate::exec::TaskSupervisor;
use crate::watch::ChangeSource;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one supervisor per task, with the default output listeners
/// - the file watcher and the orchestrator
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Supervisors first: every task should be running before the watcher
    // starts dispatching changes. A task that fails to start is fatal for
    // the whole run rather than running a partial task set.
    let mut supervisors = Vec::with_capacity(cfg.tasks.len());
    for descriptor in cfg.tasks.iter().cloned() {
        let sup = TaskSupervisor::new(descriptor)?;
        sup.register_stdout(output::write_stdout);
        sup.register_stderr(output::write_stderr);
        sup.start()?;
        supervisors.push(sup);
    }

    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let source = ChangeSource::new(root);
    let orchestrator = Orchestrator::new(supervisors);
    orchestrator.attach(&source);
    source.start()?;

    info!(
        tasks = orchestrator.supervisors().len(),
        "procwatch running; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    for sup in orchestrator.supervisors() {
        if let Err(err) = sup.stop() {
            error!(task = %sup.name(), error = %err, "failed to stop task");
        }
    }
    if let Err(err) = source.stop() {
        error!(error = %err, "failed to stop file watcher");
    }

    Ok(())
}

/// Simple dry-run output: print tasks and their reload policy.
fn print_dry_run(cfg: &ConfigFile) {
    println!("procwatch dry-run");
    println!();

    println!("tasks ({}):", cfg.tasks.len());
    for task in cfg.tasks.iter() {
        println!("  - {}", task.name);
        println!("      cmd: {}", task.command);
        if !task.paths.is_empty() {
            println!("      paths: {:?}", task.paths);
        }
        if task.restart_on_exit {
            println!("      restart_on_exit: true");
        }
        println!("      restart_delay: {:?}", task.restart_delay);
    }
}
