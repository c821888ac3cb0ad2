// tests/supervisor_lifecycle.rs
#![cfg(unix)]

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use procwatch::config::TaskDescriptor;
use procwatch::exec::TaskSupervisor;

type TestResult = Result<(), Box<dyn Error>>;

fn descriptor(name: &str, command: &str) -> TaskDescriptor {
    TaskDescriptor {
        name: name.to_string(),
        command: command.to_string(),
        paths: Vec::new(),
        restart_on_exit: false,
        restart_delay: Duration::from_millis(50),
    }
}

fn pid_of(id: &str) -> Option<i32> {
    id.split(':').nth(1)?.parse().ok()
}

#[tokio::test]
async fn id_reflects_process_state() -> TestResult {
    init_tracing();

    let sup = TaskSupervisor::new(descriptor("test", "sleep 100"))?;
    assert_eq!(sup.name(), "test");
    assert_eq!(sup.id(), "test:stopped");

    sup.start()?;
    let id = sup.id();
    assert!(id.starts_with("test:"));
    assert_ne!(id, "test:stopped");
    assert!(pid_of(&id).is_some(), "running id must carry a pid: {id}");

    sup.stop()?;
    assert_eq!(sup.id(), "test:stopped");

    Ok(())
}

#[tokio::test]
async fn stop_without_process_is_a_no_op() -> TestResult {
    init_tracing();

    let sup = TaskSupervisor::new(descriptor("idle", "sleep 100"))?;
    sup.stop()?;
    sup.stop()?;

    Ok(())
}

#[tokio::test]
async fn output_lines_reach_listeners_on_both_streams() -> TestResult {
    init_tracing();

    let sup = TaskSupervisor::new(descriptor("test", "echo out && echo err >&2"))?;

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (err_tx, mut err_rx) = mpsc::unbounded_channel::<String>();
    sup.register_stdout(move |_sup, line| {
        let _ = out_tx.send(line.to_string());
    });
    sup.register_stderr(move |_sup, line| {
        let _ = err_tx.send(line.to_string());
    });

    sup.start()?;

    let out = timeout(Duration::from_secs(2), out_rx.recv())
        .await?
        .expect("stdout listener should receive a line");
    assert_eq!(out, "out");

    let err = timeout(Duration::from_secs(2), err_rx.recv())
        .await?
        .expect("stderr listener should receive a line");
    assert_eq!(err, "err");

    sup.stop()?;
    Ok(())
}

#[tokio::test]
async fn every_stdout_listener_receives_each_line() -> TestResult {
    init_tracing();

    let sup = TaskSupervisor::new(descriptor("test", "echo hello"))?;

    let (tx_a, mut rx_a) = mpsc::unbounded_channel::<String>();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel::<String>();
    sup.register_stdout(move |_sup, line| {
        let _ = tx_a.send(line.to_string());
    });
    sup.register_stdout(move |_sup, line| {
        let _ = tx_b.send(line.to_string());
    });

    sup.start()?;

    for rx in [&mut rx_a, &mut rx_b] {
        let line = timeout(Duration::from_secs(2), rx.recv())
            .await?
            .expect("each listener should receive the line");
        assert_eq!(line, "hello");
    }

    Ok(())
}

/// A crashing command with restart enabled keeps coming back: each restart
/// echoes once, so several lines arrive within a bounded window.
#[tokio::test]
async fn restart_on_exit_keeps_task_coming_back() -> TestResult {
    init_tracing();

    let mut d = descriptor("ticker", "echo tick");
    d.restart_on_exit = true;
    let sup = TaskSupervisor::new(d)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    sup.register_stdout(move |_sup, line| {
        let _ = tx.send(line.to_string());
    });

    sup.start()?;

    for _ in 0..3 {
        let line = timeout(Duration::from_secs(3), rx.recv())
            .await?
            .expect("restarted task should echo again");
        assert_eq!(line, "tick");
    }

    sup.stop()?;
    Ok(())
}

#[tokio::test]
async fn no_restart_when_disabled() -> TestResult {
    init_tracing();

    let sup = TaskSupervisor::new(descriptor("oneshot", "true"))?;
    sup.start()?;

    sleep(Duration::from_millis(300)).await;
    assert_eq!(sup.id(), "oneshot:stopped");

    // Still stopped after another delay window: no restart ever happens.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(sup.id(), "oneshot:stopped");

    Ok(())
}

/// Killing the process externally results in a new process appearing within
/// the restart delay.
#[tokio::test]
async fn externally_killed_process_is_replaced() -> TestResult {
    init_tracing();

    let mut d = descriptor("web", "sleep 100");
    d.restart_on_exit = true;
    let sup = TaskSupervisor::new(d)?;
    sup.start()?;

    let first = sup.id();
    let pid = pid_of(&first).expect("running task must have a pid");
    kill(Pid::from_raw(pid), Signal::SIGKILL)?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        sleep(Duration::from_millis(25)).await;
        let id = sup.id();
        if id != first && !id.ends_with(":stopped") {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task was not restarted after external kill; last id: {id}"
        );
    }

    sup.stop()?;
    Ok(())
}

/// Starting an already-running supervisor must not replace (and orphan) the
/// live process.
#[tokio::test]
async fn start_while_running_is_a_no_op() -> TestResult {
    init_tracing();

    let sup = TaskSupervisor::new(descriptor("web", "sleep 100"))?;
    sup.start()?;
    let first = sup.id();

    sup.start()?;
    assert_eq!(sup.id(), first);

    sup.stop()?;
    Ok(())
}

/// A stop issued while the exit watcher is waiting out the restart delay
/// cancels the pending auto-restart: stop is final.
#[tokio::test]
async fn stop_during_restart_delay_cancels_auto_restart() -> TestResult {
    init_tracing();

    let mut d = descriptor("web", "sleep 100");
    d.restart_on_exit = true;
    d.restart_delay = Duration::from_millis(300);
    let sup = TaskSupervisor::new(d)?;
    sup.start()?;

    let pid = pid_of(&sup.id()).expect("running task must have a pid");
    kill(Pid::from_raw(pid), Signal::SIGKILL)?;

    // Wait for the exit watcher to notice; the delayed restart is now armed.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while sup.id() != "web:stopped" {
        assert!(
            tokio::time::Instant::now() < deadline,
            "exit watcher did not clear the handle"
        );
        sleep(Duration::from_millis(25)).await;
    }

    sup.stop()?;

    sleep(Duration::from_millis(800)).await;
    assert_eq!(sup.id(), "web:stopped");

    Ok(())
}

/// A deliberate stop is final even with restart_on_exit set; only unexpected
/// exits trigger the auto-restart path.
#[tokio::test]
async fn stop_is_not_undone_by_auto_restart() -> TestResult {
    init_tracing();

    let mut d = descriptor("web", "sleep 100");
    d.restart_on_exit = true;
    let sup = TaskSupervisor::new(d)?;
    sup.start()?;

    sup.stop()?;

    sleep(Duration::from_millis(300)).await;
    assert_eq!(sup.id(), "web:stopped");

    Ok(())
}
