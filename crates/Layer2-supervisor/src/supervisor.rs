//! Supervisor - owns one external worker process
//!
//! Features:
//! - Start/stop with a strict state machine (`SupervisorState`)
//! - Line-wise stdout/stderr capture into a per-run log file and the feed
//! - Graceful shutdown with SIGTERM -> kill escalation, bounded in time
//! - Exit classification: requested stop or code 0 -> Stopped, else Error
//!
//! One task per run owns the `Child` and both pipes; it is the only producer
//! of process output, so lines of a tool always arrive in emission order.
//! All lifecycle decisions happen under a single state lock.

use crate::event::SupervisorEvent;
use crate::log::{LineAssembler, LogLine, LogStream, RunLog};
use crate::settings::SupervisorSettings;
use crate::signal;
use crate::state::SupervisorState;
use chrono::Local;
use launchpad_foundation::{Error, Result, ToolDescriptor};
use parking_lot::{Mutex, RwLock};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Pipe read size
const READ_CHUNK: usize = 8 * 1024;

/// What `stop()` needs from the live run
struct StopTicket {
    run_id: u64,
    pid: Option<u32>,
    control: mpsc::UnboundedSender<Control>,
    exited: watch::Receiver<bool>,
}

/// Requests from `stop()` to the run task
#[derive(Debug)]
enum Control {
    Kill,
}

/// Live run bookkeeping, present while a process may exist
struct RunHandle {
    run_id: u64,
    pid: Option<u32>,
    /// Dashboard port bound by this run, if any
    port: Option<u16>,
    control: mpsc::UnboundedSender<Control>,
    exited: watch::Receiver<bool>,
}

struct Core {
    state: SupervisorState,
    run: Option<RunHandle>,
    next_run_id: u64,
}

/// Everything a line passes through on its way out
struct Output {
    events: mpsc::UnboundedSender<SupervisorEvent>,
    run_log: Option<RunLog>,
    /// Run whose task may still emit; lines from any other run are dropped
    live_run: Option<u64>,
}

struct Shared {
    tool_id: String,
    core: Mutex<Core>,
    output: Mutex<Output>,
    state_tx: watch::Sender<SupervisorState>,
}

impl Shared {
    /// Write a line to the run log (if open) and the event channel
    ///
    /// The output lock is held for both so file order matches feed order.
    /// The first write failure closes the file and is reported once.
    fn emit(&self, stream: LogStream, text: impl Into<String>) {
        let mut out = self.output.lock();
        self.emit_locked(&mut out, stream, text.into());
    }

    /// Emit on behalf of a run task; ignored once that run is no longer live
    fn emit_from(&self, run_id: u64, stream: LogStream, text: impl Into<String>) -> bool {
        let mut out = self.output.lock();
        if out.live_run != Some(run_id) {
            return false;
        }
        self.emit_locked(&mut out, stream, text.into());
        true
    }

    fn emit_locked(&self, out: &mut Output, stream: LogStream, text: String) {
        let line = LogLine::new(self.tool_id.clone(), stream, text);

        let mut notice = None;
        if let Some(log) = out.run_log.as_mut() {
            if let Err(e) = log.write_line(&line) {
                warn!(tool = %self.tool_id, "Log file write failed: {}", e);
                notice = Some(LogLine::new(
                    self.tool_id.clone(),
                    LogStream::Supervisor,
                    format!(
                        "Log file write failed ({}): {}; continuing without file",
                        log.path().display(),
                        e
                    ),
                ));
            }
        }

        let _ = out.events.send(SupervisorEvent::Line(line));
        if let Some(notice) = notice {
            out.run_log = None;
            let _ = out.events.send(SupervisorEvent::Line(notice));
        }
    }

    fn transition(&self, core: &mut Core, to: SupervisorState) {
        let from = core.state;
        if from == to {
            return;
        }
        core.state = to;
        debug!(tool = %self.tool_id, "{} -> {}", from, to);

        // Event first: a watcher woken by the state sees the event queued
        {
            let out = self.output.lock();
            let _ = out.events.send(SupervisorEvent::StateChanged {
                tool_id: self.tool_id.clone(),
                from,
                to,
            });
        }
        self.state_tx.send_replace(to);
    }

    fn open_run_log(&self, run_id: u64, path: &Path) {
        let opened = RunLog::open(path);
        let failure = {
            let mut out = self.output.lock();
            out.live_run = Some(run_id);
            match opened {
                Ok(log) => {
                    out.run_log = Some(log);
                    None
                }
                Err(e) => {
                    out.run_log = None;
                    Some(e)
                }
            }
        };
        if let Some(e) = failure {
            warn!(tool = %self.tool_id, "Cannot open log file {}: {}", path.display(), e);
            self.emit(
                LogStream::Supervisor,
                format!("Cannot open log file {}: {}", path.display(), e),
            );
        }
    }

    /// End the run's output: close its file and stop accepting its lines
    fn close_run_log(&self) {
        let mut out = self.output.lock();
        out.run_log = None;
        out.live_run = None;
    }

    /// Report a dashboard port that is still bound after a stop
    ///
    /// Called before the run log closes so the notice lands in the file too.
    fn check_port_released(&self, port: u16) {
        if port_in_use(port) {
            warn!(tool = %self.tool_id, port, "Port still in use after stop");
            self.emit(
                LogStream::Supervisor,
                format!("Port {} still in use after stop", port),
            );
        } else {
            debug!(tool = %self.tool_id, port, "Port released");
        }
    }

    fn is_current(&self, run_id: u64) -> bool {
        self.core
            .lock()
            .run
            .as_ref()
            .map_or(false, |run| run.run_id == run_id)
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Supervises the worker process of one tool
pub struct Supervisor {
    descriptor: RwLock<Arc<ToolDescriptor>>,
    settings: SupervisorSettings,
    shared: Arc<Shared>,
}

impl Supervisor {
    /// Create an idle supervisor; events go to `events`
    pub fn new(
        descriptor: ToolDescriptor,
        settings: SupervisorSettings,
        events: mpsc::UnboundedSender<SupervisorEvent>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SupervisorState::Stopped);
        let shared = Arc::new(Shared {
            tool_id: descriptor.id.clone(),
            core: Mutex::new(Core {
                state: SupervisorState::Stopped,
                run: None,
                next_run_id: 1,
            }),
            output: Mutex::new(Output {
                events,
                run_log: None,
                live_run: None,
            }),
            state_tx,
        });

        Self {
            descriptor: RwLock::new(Arc::new(descriptor)),
            settings,
            shared,
        }
    }

    pub fn id(&self) -> &str {
        &self.shared.tool_id
    }

    /// Descriptor used by the next start
    pub fn descriptor(&self) -> Arc<ToolDescriptor> {
        Arc::clone(&self.descriptor.read())
    }

    /// Replace the descriptor; a live run keeps the one it started with
    pub(crate) fn set_descriptor(&self, descriptor: ToolDescriptor) {
        *self.descriptor.write() = Arc::new(descriptor);
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    pub fn state(&self) -> SupervisorState {
        self.shared.core.lock().state
    }

    /// Receiver tracking the latest state
    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.shared.state_tx.subscribe()
    }

    /// PID of the live process, if any
    pub fn pid(&self) -> Option<u32> {
        self.shared.core.lock().run.as_ref().and_then(|run| run.pid)
    }

    pub fn log_path(&self) -> PathBuf {
        self.descriptor().log_path.clone()
    }

    // ========================================================================
    // Start
    // ========================================================================

    /// Launch the worker
    ///
    /// No-op (returning the current state) unless Stopped or Error. A failed
    /// preflight or spawn leaves the supervisor in Error with one diagnostic
    /// line and is not retried.
    pub async fn start(&self) -> Result<SupervisorState> {
        let descriptor = self.descriptor();
        let shared = &self.shared;
        let mut core = shared.core.lock();

        if !core.state.can_start() {
            debug!(tool = %shared.tool_id, state = %core.state, "Start ignored");
            return Ok(core.state);
        }

        let run_id = core.next_run_id;
        core.next_run_id += 1;

        shared.transition(&mut core, SupervisorState::Starting);
        shared.open_run_log(run_id, &descriptor.log_path);
        self.emit_banner(&descriptor);

        if let Err(reason) = descriptor.invocation.preflight() {
            return Err(self.fail_start(&mut core, &descriptor, reason));
        }

        let mut child = match self.build_command(&descriptor).spawn() {
            Ok(child) => child,
            Err(e) => {
                let reason = format!(
                    "Failed to start {}: {}",
                    descriptor.invocation.interpreter.display(),
                    e
                );
                return Err(self.fail_start(&mut core, &descriptor, reason));
            }
        };

        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        match child.try_wait() {
            Ok(None) => {
                if let Some(pid) = pid {
                    shared.emit(LogStream::Supervisor, format!("PID: {}", pid));
                }
            }
            Ok(Some(status)) => {
                debug!(tool = %shared.tool_id, "Exited before liveness check: {}", status)
            }
            Err(e) => debug!(tool = %shared.tool_id, "Liveness check failed: {}", e),
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (exited_tx, exited_rx) = watch::channel(false);
        core.run = Some(RunHandle {
            run_id,
            pid,
            port: descriptor.dashboard_port,
            control: control_tx,
            exited: exited_rx,
        });
        shared.transition(&mut core, SupervisorState::Running);
        drop(core);

        info!(tool = %shared.tool_id, pid = ?pid, "Started {}", descriptor.label);

        let task = RunTask {
            shared: Arc::clone(shared),
            run_id,
            pid,
            settings: self.settings.clone(),
        };
        tokio::spawn(task.run(child, stdout, stderr, control_rx, exited_tx));

        Ok(SupervisorState::Running)
    }

    fn emit_banner(&self, descriptor: &ToolDescriptor) {
        let shared = &self.shared;
        let inv = &descriptor.invocation;

        shared.emit(
            LogStream::Supervisor,
            format!("==== {} START ====", timestamp()),
        );
        shared.emit(
            LogStream::Supervisor,
            format!("Using: {}", inv.interpreter.display()),
        );
        shared.emit(
            LogStream::Supervisor,
            format!("Working dir: {}", inv.working_dir.display()),
        );
        shared.emit(
            LogStream::Supervisor,
            format!("Script: {}", inv.script.display()),
        );
        if let Some(url) = &descriptor.moonraker_url {
            shared.emit(LogStream::Supervisor, format!("Moonraker URL: {}", url));
        }
        if let Some(port) = descriptor.dashboard_port {
            shared.emit(LogStream::Supervisor, format!("Dashboard port: {}", port));
        }
    }

    fn fail_start(&self, core: &mut Core, descriptor: &ToolDescriptor, reason: String) -> Error {
        let shared = &self.shared;
        warn!(tool = %shared.tool_id, "{}", reason);
        shared.emit(LogStream::Supervisor, reason.clone());
        shared.transition(core, SupervisorState::Error);
        shared.close_run_log();
        Error::spawn(&descriptor.label, reason)
    }

    fn build_command(&self, descriptor: &ToolDescriptor) -> Command {
        let inv = &descriptor.invocation;
        let mut command = Command::new(&inv.interpreter);
        command
            .args(inv.command_args())
            .current_dir(&inv.working_dir)
            .envs(&descriptor.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            if self.settings.kill_process_group {
                command.process_group(0);
            }
        }

        #[cfg(windows)]
        {
            // CREATE_NO_WINDOW
            command.creation_flags(0x0800_0000);
        }

        command
    }

    // ========================================================================
    // Stop
    // ========================================================================

    /// Stop with the graceful timeout of this tool's kind
    pub async fn stop(&self) -> SupervisorState {
        let graceful = self.settings.graceful_timeout(self.descriptor().kind);
        self.stop_with_timeout(graceful).await
    }

    /// Stop during teardown (rebuild removal, registry shutdown)
    pub async fn shutdown(&self) -> SupervisorState {
        self.stop_with_timeout(self.settings.teardown_timeout).await
    }

    /// Terminate the worker, escalating to a kill after `graceful`
    ///
    /// No-op when Stopped, Error or already Stopping. Returns within
    /// `graceful + kill_wait`; if the exit is still unconfirmed by then the
    /// run is abandoned and the supervisor reports Stopped.
    pub async fn stop_with_timeout(&self, graceful: Duration) -> SupervisorState {
        let shared = &self.shared;
        let ticket = {
            let mut core = shared.core.lock();
            if !core.state.is_active() {
                debug!(tool = %shared.tool_id, state = %core.state, "Stop ignored");
                return core.state;
            }
            let Some(run) = core.run.as_ref() else {
                return core.state;
            };
            let ticket = StopTicket {
                run_id: run.run_id,
                pid: run.pid,
                control: run.control.clone(),
                exited: run.exited.clone(),
            };
            shared.transition(&mut core, SupervisorState::Stopping);
            shared.emit(
                LogStream::Supervisor,
                format!("==== {} STOP requested ====", timestamp()),
            );
            ticket
        };

        info!(tool = %shared.tool_id, "Stopping (graceful {:?})", graceful);
        self.terminate(ticket, graceful).await
    }

    async fn terminate(&self, ticket: StopTicket, graceful: Duration) -> SupervisorState {
        let shared = &self.shared;
        let StopTicket {
            run_id,
            pid,
            control,
            mut exited,
        } = ticket;

        // Phase 1: graceful
        let mut graceful_sent = true;
        if let Some(pid) = pid {
            if let Err(e) = signal::terminate(pid, self.settings.kill_process_group) {
                debug!(tool = %shared.tool_id, "Terminate signal failed: {}", e);
                graceful_sent = e.kind() != io::ErrorKind::Unsupported;
            }
        }
        if graceful_sent {
            wait_for_exit(&mut exited, graceful).await;
            if !shared.is_current(run_id) {
                return self.state();
            }
        }

        // Phase 2: forced
        warn!(
            tool = %shared.tool_id,
            "No exit after {:.1}s, force-killing", graceful.as_secs_f64()
        );
        shared.emit(
            LogStream::Supervisor,
            format!(
                "No exit after {:.1}s; force-killing process.",
                graceful.as_secs_f64()
            ),
        );
        if control.send(Control::Kill).is_err() {
            if let Some(pid) = pid {
                let _ = signal::kill_group(pid);
            }
        }
        wait_for_exit(&mut exited, self.settings.kill_wait).await;
        if !shared.is_current(run_id) {
            return self.state();
        }

        // Phase 3: give up waiting
        let mut core = shared.core.lock();
        if core.run.as_ref().map_or(false, |run| run.run_id == run_id) {
            let port = core.run.take().and_then(|run| run.port);
            warn!(tool = %shared.tool_id, "Exit not confirmed after kill, marking stopped");
            shared.emit(
                LogStream::Supervisor,
                format!(
                    "Exit not confirmed {:.1}s after kill; marking stopped.",
                    self.settings.kill_wait.as_secs_f64()
                ),
            );
            if let Some(port) = port {
                shared.check_port_released(port);
            }
            shared.transition(&mut core, SupervisorState::Stopped);
            shared.close_run_log();
        }
        core.state
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        let core = self.shared.core.lock();
        if let Some(run) = core.run.as_ref() {
            debug!(tool = %self.shared.tool_id, "Dropped with live process, killing");
            let _ = run.control.send(Control::Kill);
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("id", &self.shared.tool_id)
            .field("state", &self.state())
            .finish()
    }
}

async fn wait_for_exit(exited: &mut watch::Receiver<bool>, timeout: Duration) {
    let _ = tokio::time::timeout(timeout, exited.wait_for(|done| *done)).await;
}

/// Something (still) listens on the loopback port
fn port_in_use(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_err()
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("code={}", code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return format!("signal={}", sig);
        }
    }
    "code=unknown".to_string()
}

// ============================================================================
// Run task
// ============================================================================

/// One pipe plus its line assembler
struct Pump<R> {
    reader: Option<R>,
    assembler: LineAssembler,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> Pump<R> {
    fn new(reader: Option<R>, strip_ansi: bool) -> Self {
        Self {
            reader,
            assembler: LineAssembler::new(strip_ansi),
            buf: vec![0; READ_CHUNK],
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Read one chunk; returns the lines it completed
    async fn read(&mut self) -> Vec<String> {
        let Some(reader) = self.reader.as_mut() else {
            return Vec::new();
        };
        match reader.read(&mut self.buf).await {
            Ok(0) => self.close(),
            Ok(n) => self.assembler.push(&self.buf[..n]),
            Err(e) => {
                debug!("Pipe read failed: {}", e);
                self.close()
            }
        }
    }

    /// Drop the pipe and flush any partial line
    fn close(&mut self) -> Vec<String> {
        self.reader = None;
        self.assembler.finish().into_iter().collect()
    }
}

struct RunTask {
    shared: Arc<Shared>,
    run_id: u64,
    pid: Option<u32>,
    settings: SupervisorSettings,
}

impl RunTask {
    async fn run(
        self,
        mut child: Child,
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
        mut control: mpsc::UnboundedReceiver<Control>,
        exited: watch::Sender<bool>,
    ) {
        let mut out = Pump::new(stdout, self.settings.strip_ansi);
        let mut err = Pump::new(stderr, self.settings.strip_ansi);

        let status = loop {
            tokio::select! {
                lines = out.read(), if out.is_open() => self.emit_lines(LogStream::Stdout, lines),
                lines = err.read(), if err.is_open() => self.emit_lines(LogStream::Stderr, lines),
                status = child.wait() => break status,
                Some(Control::Kill) = control.recv() => self.force_kill(&mut child),
            }
        };

        // Grandchildren may still hold the pipes; drain for a bounded time
        let drain = async {
            while out.is_open() || err.is_open() {
                tokio::select! {
                    lines = out.read(), if out.is_open() => self.emit_lines(LogStream::Stdout, lines),
                    lines = err.read(), if err.is_open() => self.emit_lines(LogStream::Stderr, lines),
                }
            }
        };
        if tokio::time::timeout(self.settings.drain_timeout, drain)
            .await
            .is_err()
        {
            debug!(tool = %self.shared.tool_id, "Output still open after exit, not waiting");
        }
        let rest_out = out.close();
        let rest_err = err.close();
        self.emit_lines(LogStream::Stdout, rest_out);
        self.emit_lines(LogStream::Stderr, rest_err);

        self.finish(status);
        exited.send_replace(true);
    }

    fn emit_lines(&self, stream: LogStream, lines: Vec<String>) {
        for line in lines {
            if !self.shared.emit_from(self.run_id, stream, line) {
                debug!(
                    tool = %self.shared.tool_id,
                    run = self.run_id,
                    "Output of abandoned run dropped"
                );
                return;
            }
        }
    }

    fn force_kill(&self, child: &mut Child) {
        if self.settings.kill_process_group {
            if let Some(pid) = self.pid {
                if let Err(e) = signal::kill_group(pid) {
                    debug!(tool = %self.shared.tool_id, "Group kill failed: {}", e);
                }
            }
        }
        if let Err(e) = child.start_kill() {
            debug!(tool = %self.shared.tool_id, "Kill failed: {}", e);
        }
    }

    /// Classify the exit and settle the state
    fn finish(&self, status: io::Result<ExitStatus>) {
        let shared = &self.shared;
        let mut core = shared.core.lock();

        if !core.run.as_ref().map_or(false, |run| run.run_id == self.run_id) {
            debug!(tool = %shared.tool_id, run = self.run_id, "Exit of abandoned run ignored");
            return;
        }
        let stop_requested = core.state == SupervisorState::Stopping;
        let port = core.run.take().and_then(|run| run.port);

        let (summary, success) = match &status {
            Ok(status) => (describe_exit(status), status.success()),
            Err(e) => (format!("code=unknown ({})", e), false),
        };
        shared.emit(
            LogStream::Supervisor,
            format!("==== {} EXIT {} ====", timestamp(), summary),
        );

        let next = if stop_requested || success {
            info!(tool = %shared.tool_id, "Exited ({})", summary);
            if stop_requested {
                if let Some(port) = port {
                    shared.check_port_released(port);
                }
            }
            SupervisorState::Stopped
        } else {
            warn!(tool = %shared.tool_id, "Exited abnormally ({})", summary);
            shared.emit(
                LogStream::Supervisor,
                format!("Process exited abnormally ({})", summary),
            );
            SupervisorState::Error
        };

        shared.transition(&mut core, next);
        shared.close_run_log();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchpad_foundation::ToolEntry;

    fn descriptor(dir: &Path) -> ToolDescriptor {
        ToolEntry::new("dash1", "Dash", "missing", "app.py")
            .with_interpreter("sh")
            .validate(dir)
            .unwrap()
    }

    #[tokio::test]
    async fn test_stop_when_stopped_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sup = Supervisor::new(descriptor(dir.path()), SupervisorSettings::default(), tx);

        assert_eq!(sup.stop().await, SupervisorState::Stopped);
        assert!(rx.try_recv().is_err());
        assert_eq!(sup.pid(), None);
    }

    #[tokio::test]
    async fn test_preflight_failure_sets_error() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sup = Supervisor::new(descriptor(dir.path()), SupervisorSettings::default(), tx);

        let err = sup.start().await.unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
        assert_eq!(sup.state(), SupervisorState::Error);

        let mut diagnostics = Vec::new();
        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                SupervisorEvent::Line(line) if line.text.starts_with("Script not found") => {
                    diagnostics.push(line)
                }
                SupervisorEvent::StateChanged { to, .. } => states.push(to),
                _ => {}
            }
        }
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            states,
            vec![SupervisorState::Starting, SupervisorState::Error]
        );
    }

    #[test]
    fn test_abandoned_run_output_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sup = Supervisor::new(descriptor(dir.path()), SupervisorSettings::default(), tx);
        let shared = &sup.shared;
        let second_log = dir.path().join("second.log");

        shared.open_run_log(1, &dir.path().join("first.log"));
        assert!(shared.emit_from(1, LogStream::Stdout, "one"));
        shared.close_run_log();
        assert!(!shared.emit_from(1, LogStream::Stdout, "late"));

        // 다음 run이 열린 뒤에도 이전 run의 출력은 섞이지 않음
        shared.open_run_log(2, &second_log);
        assert!(!shared.emit_from(1, LogStream::Stdout, "later"));
        assert!(shared.emit_from(2, LogStream::Stdout, "two"));
        shared.close_run_log();

        let mut texts = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SupervisorEvent::Line(line) = event {
                texts.push(line.text);
            }
        }
        assert_eq!(texts, vec!["one", "two"]);

        let content = std::fs::read_to_string(&second_log).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with("[stdout] two\n"));
    }

    #[test]
    fn test_port_in_use() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(port_in_use(port));
        drop(listener);
        assert!(!port_in_use(port));
    }

    #[cfg(unix)]
    #[test]
    fn test_describe_exit_code() {
        let status = std::process::Command::new("sh")
            .args(["-c", "exit 3"])
            .status()
            .unwrap();
        assert_eq!(describe_exit(&status), "code=3");
    }
}
