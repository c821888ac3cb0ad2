// src/exec/supervisor.rs

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::config::TaskDescriptor;
use crate::debounce::Debouncer;
use crate::errors::{ProcwatchError, Result};
use crate::watch::PathMatcher;

/// Called once per output line, with the supervisor that produced it.
///
/// Listeners run as independent fire-and-forget tasks: one task per listener
/// per line. Within one stream, lines are dispatched in arrival order; no
/// ordering holds across listeners or across streams. There is no
/// backpressure, so a listener that never returns leaks one task per line.
pub type OutputListener = Arc<dyn Fn(&TaskSupervisor, &str) + Send + Sync>;

/// The one live OS process a supervisor may own at any instant.
///
/// `generation` ties the handle to the exit watcher spawned with it, so the
/// watcher can tell an unexpected exit from a deliberate stop or a
/// replacement by a newer spawn.
struct ProcessHandle {
    pid: u32,
    generation: u64,
}

/// Owns and drives the lifecycle of one named task's OS process.
///
/// State machine: `Stopped -> Starting -> Running -> Exited -> Stopped`,
/// with an automatic `Stopped -> Starting` transition on unexpected exit
/// when `restart_on_exit` is set. [`TaskSupervisor::reload`] from any state
/// schedules a debounced stop-then-start.
pub struct TaskSupervisor {
    name: String,
    command: String,
    matcher: PathMatcher,
    restart_on_exit: bool,
    restart_delay: Duration,
    debounce: Debouncer,
    handle: Mutex<Option<ProcessHandle>>,
    spawn_seq: AtomicU64,
    // Bumped by every successful stop(); sampled under the handle lock so a
    // delayed auto-restart can tell whether a stop happened in between.
    stop_seq: AtomicU64,
    stdout_listeners: RwLock<Vec<OutputListener>>,
    stderr_listeners: RwLock<Vec<OutputListener>>,
}

enum OutputStream {
    Stdout,
    Stderr,
}

impl TaskSupervisor {
    /// Build a supervisor from its descriptor.
    ///
    /// Fails with a `PatternError` if any path glob is invalid; the task is
    /// then never created.
    pub fn new(descriptor: TaskDescriptor) -> Result<Arc<Self>> {
        let matcher = PathMatcher::new(&descriptor.name, &descriptor.paths)?;

        Ok(Arc::new(Self {
            name: descriptor.name,
            command: descriptor.command,
            matcher,
            restart_on_exit: descriptor.restart_on_exit,
            restart_delay: descriptor.restart_delay,
            debounce: Debouncer::new(descriptor.restart_delay),
            handle: Mutex::new(None),
            spawn_seq: AtomicU64::new(0),
            stop_seq: AtomicU64::new(0),
            stdout_listeners: RwLock::new(Vec::new()),
            stderr_listeners: RwLock::new(Vec::new()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display identifier reflecting current state at call time:
    /// `web:4321` while the process runs, `web:stopped` otherwise.
    pub fn id(&self) -> String {
        match *self.lock_handle() {
            Some(ref handle) => format!("{}:{}", self.name, handle.pid),
            None => format!("{}:stopped", self.name),
        }
    }

    /// True iff the changed path is relevant to this task. Pure.
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    /// Append a stdout listener. Safe to call before or after `start`.
    pub fn register_stdout(
        &self,
        listener: impl Fn(&TaskSupervisor, &str) + Send + Sync + 'static,
    ) {
        lock_registry(&self.stdout_listeners).push(Arc::new(listener));
    }

    /// Append a stderr listener. Safe to call before or after `start`.
    pub fn register_stderr(
        &self,
        listener: impl Fn(&TaskSupervisor, &str) + Send + Sync + 'static,
    ) {
        lock_registry(&self.stderr_listeners).push(Arc::new(listener));
    }

    /// Spawn the task's command and begin supervising it.
    ///
    /// A supervisor whose process is already running is a no-op success:
    /// there is never more than one process per supervisor, and a second
    /// `start` must not orphan the first.
    ///
    /// Launches two line readers (stdout, stderr) and an exit watcher. The
    /// exit watcher owns the child: when the process terminates it logs the
    /// exit and clears the handle. If `restart_on_exit` is set and the exit
    /// was not caused by [`TaskSupervisor::stop`], it waits `restart_delay`
    /// and starts the task again, so a command that crashes immediately
    /// restarts at most once per delay window. The delayed restart yields to
    /// any `start` or `stop` that happens while it is waiting.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut slot = self.lock_handle();
        if slot.is_some() {
            debug!(task = %self.name, "already running; start is a no-op");
            return Ok(());
        }

        self.spawn_process(&mut slot)
    }

    fn spawn_process(self: &Arc<Self>, slot: &mut Option<ProcessHandle>) -> Result<()> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ProcwatchError::SpawnError {
                task: self.name.clone(),
                source: err,
            })?;

        let pid = child.id().unwrap_or(0);
        let generation = self.spawn_seq.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(task = %self.name, pid, command = %self.command, "started");

        if let Some(stdout) = child.stdout.take() {
            self.spawn_line_reader(stdout, OutputStream::Stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            self.spawn_line_reader(stderr, OutputStream::Stderr);
        }

        *slot = Some(ProcessHandle { pid, generation });

        let sup = Arc::clone(self);
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    debug!(task = %sup.name, pid, "exited cleanly");
                }
                Ok(status) => {
                    warn!(
                        task = %sup.name,
                        pid,
                        exit_code = status.code().unwrap_or(-1),
                        "exited"
                    );
                }
                Err(err) => {
                    warn!(task = %sup.name, pid, error = %err, "failed to await process");
                }
            }

            // Only the watcher whose handle is still current may clear it
            // and restart; otherwise the exit was a deliberate stop or the
            // handle already belongs to a newer process. The stop counter is
            // sampled under the same lock, so a stop() arriving during the
            // restart delay is always observed at fire time.
            let restart_token = {
                let mut slot = sup.lock_handle();
                match *slot {
                    Some(ref handle) if handle.generation == generation => {
                        *slot = None;
                        Some(sup.stop_seq.load(Ordering::Relaxed))
                    }
                    _ => None,
                }
            };

            if sup.restart_on_exit {
                if let Some(observed_stops) = restart_token {
                    sleep(sup.restart_delay).await;
                    if let Err(err) = sup.restart_after_exit(observed_stops) {
                        error!(task = %sup.name, error = %err, "failed to restart after exit");
                    }
                }
            }
        });

        Ok(())
    }

    /// Delayed restart after an unexpected exit.
    ///
    /// Re-checks state at fire time: a process already in the slot (someone
    /// started or reloaded the task during the delay) or any stop() since
    /// the exit supersedes the restart.
    fn restart_after_exit(self: &Arc<Self>, observed_stops: u64) -> Result<()> {
        let mut slot = self.lock_handle();
        if slot.is_some() {
            return Ok(());
        }
        if self.stop_seq.load(Ordering::Relaxed) != observed_stops {
            return Ok(());
        }

        self.spawn_process(&mut slot)
    }

    /// Forcibly terminate the task's process, if any.
    ///
    /// A supervisor with no running process is a no-op success. The kill is
    /// hard (SIGKILL), with no drain period for in-flight output. A process
    /// that already exited on its own counts as success, and the handle is
    /// cleared either way; only an actual OS refusal is a `KillError`, in
    /// which case the handle is retained.
    ///
    /// Every successful stop also cancels a delayed auto-restart still
    /// waiting out its delay window: stop is final.
    pub fn stop(&self) -> Result<()> {
        let mut slot = self.lock_handle();
        let Some(handle) = slot.take() else {
            self.stop_seq.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        };

        debug!(task = %self.name, pid = handle.pid, "stopping");

        match kill(Pid::from_raw(handle.pid as i32), Signal::SIGKILL) {
            Ok(()) => {
                self.stop_seq.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            // Already gone: the exit watcher won the race.
            Err(Errno::ESRCH) => {
                self.stop_seq.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(errno) => {
                let pid = handle.pid;
                *slot = Some(handle);
                Err(ProcwatchError::KillError {
                    task: self.name.clone(),
                    pid,
                    source: errno,
                })
            }
        }
    }

    /// Schedule a debounced stop-then-start.
    ///
    /// Never executes immediately: the restart is deferred by
    /// `restart_delay` from the most recent `reload` call, so a burst of
    /// calls collapses into one restart. Failures inside the scheduled
    /// action are logged, not propagated; success here means the reload was
    /// scheduled.
    pub fn reload(self: &Arc<Self>) -> Result<()> {
        let sup = Arc::clone(self);
        self.debounce.trigger(async move {
            debug!(task = %sup.id(), "reloading");

            if let Err(err) = sup.stop() {
                error!(task = %sup.name, error = %err, "failed to stop during reload");
                return;
            }
            if let Err(err) = sup.start() {
                error!(task = %sup.name, error = %err, "failed to start during reload");
            }
        });

        Ok(())
    }

    fn spawn_line_reader(
        self: &Arc<Self>,
        stream: impl AsyncRead + Unpin + Send + 'static,
        which: OutputStream,
    ) {
        let sup = Arc::clone(self);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();

            while let Ok(Some(line)) = lines.next_line().await {
                let registry = match which {
                    OutputStream::Stdout => &sup.stdout_listeners,
                    OutputStream::Stderr => &sup.stderr_listeners,
                };
                let snapshot: Vec<OutputListener> = match registry.read() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };

                for listener in snapshot {
                    let sup = Arc::clone(&sup);
                    let line = line.clone();
                    tokio::spawn(async move { listener(&sup, &line) });
                }
            }
        });
    }

    fn lock_handle(&self) -> MutexGuard<'_, Option<ProcessHandle>> {
        match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for TaskSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSupervisor")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("restart_on_exit", &self.restart_on_exit)
            .field("restart_delay", &self.restart_delay)
            .finish_non_exhaustive()
    }
}

fn lock_registry(
    registry: &RwLock<Vec<OutputListener>>,
) -> std::sync::RwLockWriteGuard<'_, Vec<OutputListener>> {
    match registry.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
