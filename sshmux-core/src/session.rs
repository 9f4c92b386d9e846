// Copyright 2026 The sshmux Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! One SSH client + interactive shell channel, and the actor that owns it.
//!
//! Mirrors the split the teacher draws between `daemon::shell::Session`
//! (the thin handle other threads hold) and `daemon::shell::SessionInner`
//! (the mutable state touched only by the shell-to-client thread):
//! `ShellSession` here is the handle, `Actor` is the inner state, and a
//! single named thread owns the `Actor` for the lifetime of the
//! connection. Every operation on the handle is a request sent down a
//! `crossbeam_channel` and, where a result is expected, a reply channel
//! the actor answers on before moving to the next request -- this is
//! what gives command scheduling an atomic decision step for free,
//! instead of needing a mutex.

use std::{
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{info, instrument, span, warn, Level};

use crate::{
    consts,
    error::SessionError,
    fanout::{Fanout, SubscriberId},
    history::CommandHistory,
    model::{self, CommandOptions, CommandRecord, CommandStatus, OutputEntry, Signal, Source, Stream},
    prompt,
    queue::{CommandQueue, QueuedCommand, Waiter},
    replay::ReplayBuffer,
    sanitize,
    transport::Transport,
};

type Reply<T> = Sender<T>;

/// One command still running on the PTY.
struct ActiveCommand {
    command_text: String,
    options: CommandOptions,
    enqueued_at_ms: i64,
    started_at_ms: i64,
    stdout_accum: Vec<u8>,
    waiter: Waiter,
}

type ObserverCallback = Box<dyn Fn(&OutputEntry) -> anyhow::Result<()> + Send>;
type HistoryCallback = Box<dyn Fn(&CommandRecord) -> anyhow::Result<()> + Send>;

enum Command {
    Enqueue { command_text: String, options: CommandOptions, waiter: Waiter },
    SendInput { bytes: Vec<u8>, reply: Reply<Result<(), SessionError>> },
    SendRawInput { bytes: Vec<u8>, reply: Reply<Result<(), SessionError>> },
    SendSignal { signal: Signal, reply: Reply<Result<(), SessionError>> },
    Resize { cols: u32, rows: u32, reply: Reply<Result<(), SessionError>> },
    GetHistory { reply: Reply<Vec<CommandRecord>> },
    GetCommandHistory { reply: Reply<Vec<CommandRecord>> },
    AttachObserver { callback: ObserverCallback, reply: Reply<(Vec<OutputEntry>, SubscriberId)> },
    DetachObserver { id: SubscriberId },
    SubscribeHistory { callback: HistoryCallback, reply: Reply<SubscriberId> },
    UnsubscribeHistory { id: SubscriberId },
    Disconnect { reason: String, reply: Reply<()> },
}

/// A live SSH client + PTY channel with its attached observers, replay
/// buffer, history and command queue. All mutable state lives behind the
/// actor thread reached through `cmd_tx`; this handle is just a set of
/// channel ends.
pub struct ShellSession {
    name: String,
    host: String,
    cmd_tx: Sender<Command>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl ShellSession {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Connects, runs the init handshake, and spawns the owning actor
    /// thread. On any failure nothing is left running.
    #[instrument(skip(transport), fields(name = %name, host = %host))]
    pub fn start(
        name: String,
        host: String,
        mut transport: Box<dyn Transport>,
        max_output_buffer: usize,
        max_history: usize,
        max_queue_size: usize,
        max_command_age: Duration,
    ) -> Result<Self, SessionError> {
        let seed_entry = run_init_handshake(transport.as_mut())?;

        let mut replay = ReplayBuffer::new(max_output_buffer);
        replay.reset_to(seed_entry);

        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();

        let actor = Actor {
            name: name.clone(),
            host: host.clone(),
            transport,
            ready: true,
            replay,
            observers: Fanout::new(),
            history: CommandHistory::new(max_history),
            history_subscribers: Fanout::new(),
            queue: CommandQueue::new(max_queue_size),
            executing: false,
            current: None,
            last_activity: model::now_ms(),
            max_command_age,
        };

        let thread_name = format!("sshmux-session-{name}");
        let join_handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || actor.run(cmd_rx))
            .map_err(|_| SessionError::TransportAuthFailed)?;

        Ok(ShellSession { name, host, cmd_tx, join_handle: Some(join_handle) })
    }

    /// Queues a command without blocking; the caller waits on `waiter`
    /// for the result.
    pub fn enqueue(&self, command_text: String, options: CommandOptions, waiter: Waiter) {
        if self.cmd_tx.send(Command::Enqueue { command_text, options, waiter: waiter.clone() }).is_err() {
            let _ = waiter.send(Err(SessionError::SessionDisconnected {
                name: self.name.clone(),
                reason: "session actor is gone".to_string(),
            }));
        }
    }

    pub fn send_input(&self, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.call(|reply| Command::SendInput { bytes, reply })
    }

    pub fn send_raw_input(&self, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.call(|reply| Command::SendRawInput { bytes, reply })
    }

    pub fn send_signal(&self, signal: Signal) -> Result<(), SessionError> {
        self.call(|reply| Command::SendSignal { signal, reply })
    }

    pub fn resize(&self, cols: u32, rows: u32) -> Result<(), SessionError> {
        self.call(|reply| Command::Resize { cols, rows, reply })
    }

    pub fn get_history(&self) -> Vec<CommandRecord> {
        self.call_infallible(|reply| Command::GetHistory { reply }, Vec::new())
    }

    pub fn get_command_history(&self) -> Vec<CommandRecord> {
        self.call_infallible(|reply| Command::GetCommandHistory { reply }, Vec::new())
    }

    /// Atomically snapshots the replay buffer and registers `callback`
    /// for every subsequent entry, so no entry produced between the
    /// snapshot and the subscription is skipped or duplicated.
    pub fn attach_observer(&self, callback: ObserverCallback) -> (Vec<OutputEntry>, SubscriberId) {
        self.call_infallible(|reply| Command::AttachObserver { callback, reply }, (Vec::new(), 0))
    }

    pub fn detach_observer(&self, id: SubscriberId) {
        let _ = self.cmd_tx.send(Command::DetachObserver { id });
    }

    pub fn subscribe_history(&self, callback: HistoryCallback) -> SubscriberId {
        self.call_infallible(|reply| Command::SubscribeHistory { callback, reply }, 0)
    }

    pub fn unsubscribe_history(&self, id: SubscriberId) {
        let _ = self.cmd_tx.send(Command::UnsubscribeHistory { id });
    }

    /// Broadcasts the disconnect entry, fails every waiter, and stops the
    /// actor thread. Blocks until the actor has fully torn down.
    pub fn disconnect(&mut self, reason: String) {
        let (reply, rx) = crossbeam_channel::bounded(1);
        if self.cmd_tx.send(Command::Disconnect { reason, reply }).is_ok() {
            let _ = rx.recv();
        }
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }

    fn call<T: Send + 'static>(&self, build: impl FnOnce(Reply<Result<T, SessionError>>) -> Command) -> Result<T, SessionError> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        if self.cmd_tx.send(build(reply)).is_err() {
            return Err(SessionError::SessionDisconnected {
                name: self.name.clone(),
                reason: "session actor is gone".to_string(),
            });
        }
        rx.recv().unwrap_or_else(|_| {
            Err(SessionError::SessionDisconnected {
                name: self.name.clone(),
                reason: "session actor is gone".to_string(),
            })
        })
    }

    fn call_infallible<T>(&self, build: impl FnOnce(Reply<T>) -> Command, default: T) -> T {
        let (reply, rx) = crossbeam_channel::bounded(1);
        if self.cmd_tx.send(build(reply)).is_err() {
            return default;
        }
        rx.recv().unwrap_or(default)
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        if self.join_handle.is_some() {
            self.disconnect("session handle dropped".to_string());
        }
    }
}

/// The mutable state a single thread owns for the lifetime of a
/// connection. `transport` lives here directly rather than behind an
/// `Option`, since the actor never outlives it.
struct Actor {
    name: String,
    host: String,
    transport: Box<dyn Transport>,
    ready: bool,
    replay: ReplayBuffer,
    observers: Fanout<OutputEntry>,
    history: CommandHistory,
    history_subscribers: Fanout<CommandRecord>,
    queue: CommandQueue,
    executing: bool,
    current: Option<ActiveCommand>,
    last_activity: i64,
    max_command_age: Duration,
}

impl Actor {
    fn run(mut self, cmd_rx: Receiver<Command>) {
        let _span = span!(Level::INFO, "shell_session", s = %self.name).entered();
        info!("session actor started");

        let mut buf = vec![0u8; consts::BUF_SIZE];
        loop {
            match self.transport.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => self.on_bytes(&buf[..n]),
                Err(e) => {
                    warn!(error = %e, "transport read failed, disconnecting");
                    self.teardown("transport read failed".to_string());
                    break;
                }
            }

            if self.transport.eof() {
                info!("remote shell exited");
                self.teardown("remote shell exited".to_string());
                break;
            }

            self.check_timeout();

            match cmd_rx.recv_timeout(Duration::from_millis(10)) {
                Ok(Command::Disconnect { reason, reply }) => {
                    self.teardown(reason);
                    let _ = reply.send(());
                    break;
                }
                Ok(cmd) => self.handle_command(cmd),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.teardown("session handle dropped".to_string());
                    break;
                }
            }

            self.maybe_start_next();
        }

        info!("session actor exiting");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Enqueue { command_text, options, waiter } => self.enqueue(command_text, options, waiter),
            Command::SendInput { bytes, reply } => {
                let _ = reply.send(self.write_bytes(&bytes));
            }
            Command::SendRawInput { bytes, reply } => {
                // Character-at-a-time observer input; the PTY was already
                // initialized with the right echo settings, so this is
                // the same write as `SendInput`.
                let _ = reply.send(self.write_bytes(&bytes));
            }
            Command::SendSignal { signal, reply } => {
                let _ = reply.send(self.write_bytes(&[signal.byte()]));
            }
            Command::Resize { cols, rows, reply } => {
                let result = if !self.ready {
                    Err(SessionError::SessionNotReady(self.name.clone()))
                } else {
                    self.transport.resize(cols, rows).map_err(|e| SessionError::ResizeFailed(e.into()))
                };
                if result.is_ok() {
                    self.last_activity = model::now_ms();
                }
                let _ = reply.send(result);
            }
            Command::GetHistory { reply } => {
                let _ = reply.send(self.history.snapshot());
            }
            Command::GetCommandHistory { reply } => {
                let _ = reply.send(self.history.program_client_snapshot());
            }
            Command::AttachObserver { callback, reply } => {
                let snapshot = self.replay.snapshot();
                let id = self.observers.subscribe(move |entry: &OutputEntry| callback(entry));
                let _ = reply.send((snapshot, id));
            }
            Command::DetachObserver { id } => self.observers.unsubscribe(id),
            Command::SubscribeHistory { callback, reply } => {
                let id = self.history_subscribers.subscribe(move |record: &CommandRecord| callback(record));
                let _ = reply.send(id);
            }
            Command::UnsubscribeHistory { id } => self.history_subscribers.unsubscribe(id),
            Command::Disconnect { .. } => unreachable!("handled in run() before dispatch"),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        if !self.ready {
            return Err(SessionError::SessionNotReady(self.name.clone()));
        }
        let result = self.transport.write_all(bytes).map_err(|e| SessionError::SessionDisconnected {
            name: self.name.clone(),
            reason: e.to_string(),
        });
        if result.is_ok() {
            self.last_activity = model::now_ms();
        }
        result
    }

    /// `enqueue`'s caller-observable failure modes, except
    /// `SessionNotFound` (the registry never reaches a dead actor) and
    /// `InvalidSource` (validated by the caller before this point, since
    /// that check must never be bypassable by re-ordering).
    fn enqueue(&mut self, command_text: String, options: CommandOptions, waiter: Waiter) {
        if !self.ready {
            let _ = waiter.send(Err(SessionError::SessionNotReady(self.name.clone())));
            return;
        }
        let trimmed = command_text.trim();
        if trimmed == "exit" || trimmed.starts_with("exit ") {
            let _ = waiter.send(Err(SessionError::ShellTerminatingCommandRejected));
            return;
        }

        let queued = QueuedCommand { command_text, options, enqueued_at_ms: model::now_ms(), waiter };
        if let Err(queued) = self.queue.push(queued) {
            let _ = queued.waiter.send(Err(SessionError::QueueFull));
        }
    }

    /// Every byte from the PTY passes through here exactly once.
    fn on_bytes(&mut self, raw: &[u8]) {
        self.last_activity = model::now_ms();

        let source = self.current.as_ref().map(|c| c.options.source).unwrap_or(Source::System);
        let normalized = sanitize::normalize(raw);
        let entry = OutputEntry {
            timestamp_ms: model::now_ms(),
            normalized_text: normalized,
            raw_text: raw.to_vec(),
            stream: Stream::Stdout,
            source,
        };

        self.observers.broadcast(&entry);

        let is_residue = String::from_utf8_lossy(raw).contains(consts::HANDSHAKE_RESIDUE);
        if !is_residue {
            self.replay.push(entry);
        }

        if let Some(current) = self.current.as_mut() {
            current.stdout_accum.extend_from_slice(raw);
            let probe = String::from_utf8_lossy(&current.stdout_accum).into_owned();
            if prompt::has_prompt(&probe) {
                self.complete_current();
            }
        }
    }

    /// Post-process the finished command and resolve its waiter.
    fn complete_current(&mut self) {
        let current = match self.current.take() {
            Some(c) => c,
            None => return,
        };
        let stdout = sanitize::extract_command_result(&current.stdout_accum, &current.command_text);
        let now = model::now_ms();

        let record = CommandRecord {
            command_text: current.command_text.clone(),
            enqueued_at_ms: current.enqueued_at_ms,
            started_at_ms: current.started_at_ms,
            duration_ms: now - current.started_at_ms,
            exit_code: 0,
            status: CommandStatus::Success,
            session_name: self.name.clone(),
            source: current.options.source,
        };
        self.history.push(record.clone());
        self.history_subscribers.broadcast(&record);

        let _ = current.waiter.send(Ok(crate::model::CommandResult { stdout, stderr: String::new(), exit_code: 0 }));

        self.executing = false;
        self.last_activity = now;
    }

    fn check_timeout(&mut self) {
        let timed_out = match &self.current {
            Some(current) => {
                let elapsed_ms = (model::now_ms() - current.started_at_ms).max(0) as u64;
                Duration::from_millis(elapsed_ms) > current.options.timeout
            }
            None => false,
        };
        if timed_out {
            if let Some(current) = self.current.take() {
                let _ = current.waiter.send(Err(SessionError::CommandTimedOut(current.options.timeout)));
            }
            self.executing = false;
        }
    }

    /// Eviction then head-selection, both happening before this thread
    /// does anything else that could yield, so no other command can ever
    /// observe `executing = false` in between.
    fn maybe_start_next(&mut self) {
        if self.executing || !self.ready {
            return;
        }
        let now = model::now_ms();
        self.queue.evict_stale(now, self.max_command_age);
        if let Some(cmd) = self.queue.pop_front() {
            self.start(cmd, now);
        }
    }

    fn start(&mut self, cmd: QueuedCommand, now: i64) {
        self.executing = true;
        let command_text = cmd.command_text.clone();
        self.current = Some(ActiveCommand {
            command_text: command_text.clone(),
            options: cmd.options,
            enqueued_at_ms: cmd.enqueued_at_ms,
            started_at_ms: now,
            stdout_accum: Vec::new(),
            waiter: cmd.waiter,
        });

        let line = format!("{command_text}\n");
        if let Err(e) = self.transport.write_all(line.as_bytes()) {
            warn!(error = %e, "failed to write command to pty");
            if let Some(current) = self.current.take() {
                let _ = current.waiter.send(Err(SessionError::SessionDisconnected {
                    name: self.name.clone(),
                    reason: e.to_string(),
                }));
            }
            self.executing = false;
        }
    }

    /// Broadcasts the synthetic close entry, fails every waiter, ends the
    /// channel.
    fn teardown(&mut self, reason: String) {
        if !self.ready {
            return;
        }
        self.ready = false;

        let close_entry = OutputEntry {
            timestamp_ms: model::now_ms(),
            normalized_text: format!("Connection to {} closed\r\n", self.host),
            raw_text: Vec::new(),
            stream: Stream::Stdout,
            source: Source::System,
        };
        self.observers.broadcast(&close_entry);
        self.replay.push(close_entry);

        let disconnect_reason = format!("Session '{}' disconnected: {}", self.name, reason);
        if let Some(current) = self.current.take() {
            let _ = current.waiter.send(Err(SessionError::SessionDisconnected {
                name: self.name.clone(),
                reason: disconnect_reason.clone(),
            }));
        }
        self.executing = false;
        self.queue.drain_with_disconnect_error(&self.name, &disconnect_reason);

        self.transport.close();
    }
}

/// Drains the handshake residue fragment from a probe buffer so it never
/// defeats prompt detection.
fn strip_residue(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).replace(consts::HANDSHAKE_RESIDUE, "")
}

fn read_until(
    transport: &mut dyn Transport,
    deadline: Instant,
    done: impl Fn(&str) -> bool,
) -> Result<Vec<u8>, SessionError> {
    let mut acc = Vec::new();
    let mut buf = [0u8; consts::BUF_SIZE];
    loop {
        if Instant::now() >= deadline {
            return Err(SessionError::ConnectTimeout(consts::CONNECT_TIMEOUT));
        }
        match transport.read(&mut buf) {
            Ok(0) => {
                if transport.eof() {
                    return Err(SessionError::TransportAuthFailed);
                }
                thread::sleep(Duration::from_millis(5));
            }
            Ok(n) => {
                acc.extend_from_slice(&buf[..n]);
                if done(&strip_residue(&acc)) {
                    return Ok(acc);
                }
            }
            Err(_) => return Err(SessionError::TransportAuthFailed),
        }
    }
}

/// The last non-blank `\r\n`-delimited line of `text`, used to pull the
/// settled bracket prompt out of the post-configuration buffer.
fn last_nonblank_line(text: &str) -> String {
    text.rsplit("\r\n").find(|line| !line.trim().is_empty()).unwrap_or("").to_string()
}

/// Runs the two-phase init handshake against a freshly opened channel and
/// returns the seed entry for the replay buffer.
#[instrument(skip(transport))]
fn run_init_handshake(transport: &mut dyn Transport) -> Result<OutputEntry, SessionError> {
    let deadline = Instant::now() + consts::CONNECT_TIMEOUT;

    // Step 1: wait for any prompt, residue filtered out of the probe.
    let _ = read_until(transport, deadline, prompt::has_prompt)?;

    // Step 2: configure a parseable bracket prompt.
    transport
        .write_all(consts::PS1_SETUP_CMD.as_bytes())
        .map_err(|_| SessionError::TransportAuthFailed)?;

    // Step 3: wait for the bracket prompt to appear.
    let post_config = read_until(transport, deadline, prompt::has_bracket_prompt)?;

    // Step 4: let the terminal settle before declaring ready.
    thread::sleep(consts::HANDSHAKE_SETTLE_DELAY);

    // Step 5: seed the replay buffer with one clean prompt entry.
    let normalized = sanitize::normalize(&post_config);
    let prompt_line = last_nonblank_line(&normalized);

    Ok(OutputEntry {
        timestamp_ms: model::now_ms(),
        normalized_text: prompt_line,
        raw_text: post_config,
        stream: Stream::Stdout,
        source: Source::System,
    })
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::transport::fake::{FakeOutput, FakeTransport};

    fn start_session(transport: FakeTransport) -> ShellSession {
        ShellSession::start(
            "s1".to_string(),
            "example.com".to_string(),
            Box::new(transport),
            consts::MAX_OUTPUT_BUFFER,
            consts::MAX_HISTORY,
            consts::MAX_QUEUE_SIZE,
            consts::MAX_COMMAND_AGE,
        )
        .unwrap()
    }

    fn exec(session: &ShellSession, command_text: &str) -> Result<CommandResultForTest, SessionError> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        session.enqueue(command_text.to_string(), CommandOptions::default(), tx);
        rx.recv_timeout(Duration::from_secs(5)).expect("actor reply").map(|r| CommandResultForTest {
            stdout: r.stdout,
            exit_code: r.exit_code,
        })
    }

    struct CommandResultForTest {
        stdout: String,
        exit_code: i32,
    }

    #[test]
    fn handshake_completes_and_seeds_replay_with_bracket_prompt() {
        let session = start_session(FakeTransport::empty());
        let (snapshot, _id) = session.attach_observer(Box::new(|_| Ok(())));
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].normalized_text.contains("[user@host ~]$"));
    }

    #[test]
    fn successful_command_round_trips_through_the_queue() {
        let transport = FakeTransport::new(|cmd| {
            if cmd.trim() == "echo hi" {
                FakeOutput::text("hi")
            } else {
                FakeOutput::default()
            }
        });
        let session = start_session(transport);
        let result = exec(&session, "echo hi").expect("command succeeds");
        assert_eq!(result.stdout, "hi");
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn shell_terminating_command_is_rejected_synchronously() {
        let session = start_session(FakeTransport::empty());
        let err = exec(&session, "exit").unwrap_err();
        assert!(matches!(err, SessionError::ShellTerminatingCommandRejected));
        // the session remains usable afterward
        let ok = exec(&session, "echo still-alive");
        assert!(ok.is_ok());
    }

    #[test]
    fn command_timeout_fails_waiter_and_frees_the_session() {
        let transport = FakeTransport::new(|_| FakeOutput::hang());
        let session = start_session(transport);

        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut opts = CommandOptions::default();
        opts.timeout = Duration::from_millis(20);
        session.enqueue("sleep 999".to_string(), opts, tx);

        let result = rx.recv_timeout(Duration::from_secs(5)).expect("actor reply");
        assert!(matches!(result, Err(SessionError::CommandTimedOut(_))));
    }

    #[test]
    fn observer_receives_only_entries_after_subscription() {
        let transport = FakeTransport::new(|cmd| {
            if cmd.trim() == "echo late" {
                FakeOutput::text("late")
            } else {
                FakeOutput::default()
            }
        });
        let session = start_session(transport);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let (_snapshot, _id) = session.attach_observer(Box::new(move |entry: &OutputEntry| {
            seen2.lock().unwrap().push(entry.normalized_text.clone());
            Ok(())
        }));

        let _ = exec(&session, "echo late");
        thread::sleep(Duration::from_millis(50));

        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|text| text.contains("late")));
    }

    #[test]
    fn signal_is_accepted_while_ready() {
        let session = start_session(FakeTransport::empty());
        assert!(session.send_signal(Signal::Sigint).is_ok());
    }

    #[test]
    fn resize_out_of_band_is_forwarded() {
        let session = start_session(FakeTransport::empty());
        assert!(session.resize(120, 40).is_ok());
    }

    #[test]
    fn disconnect_fails_queued_waiters() {
        let transport = FakeTransport::new(|_| FakeOutput::hang());
        let mut session = start_session(transport);

        let (tx1, rx1) = crossbeam_channel::bounded(1);
        session.enqueue("sleep 1".to_string(), CommandOptions::default(), tx1);
        thread::sleep(Duration::from_millis(30));
        let (tx2, rx2) = crossbeam_channel::bounded(1);
        session.enqueue("sleep 2".to_string(), CommandOptions::default(), tx2);

        session.disconnect("test teardown".to_string());

        assert!(matches!(rx1.recv().unwrap(), Err(SessionError::SessionDisconnected { .. })));
        assert!(matches!(rx2.recv().unwrap(), Err(SessionError::SessionDisconnected { .. })));
    }

    #[test]
    fn queue_full_rejects_once_the_one_free_slot_is_taken() {
        let transport = FakeTransport::new(|_| FakeOutput::hang());
        let session = ShellSession::start(
            "s1".to_string(),
            "example.com".to_string(),
            Box::new(transport),
            consts::MAX_OUTPUT_BUFFER,
            consts::MAX_HISTORY,
            1,
            consts::MAX_COMMAND_AGE,
        )
        .unwrap();

        // First command hangs forever, so it occupies `current` and never
        // frees the session; the second then occupies the one queue slot.
        let (tx1, _rx1) = crossbeam_channel::bounded(1);
        session.enqueue("sleep 1".to_string(), CommandOptions::default(), tx1);
        thread::sleep(Duration::from_millis(30));

        let (tx2, _rx2) = crossbeam_channel::bounded(1);
        session.enqueue("sleep 2".to_string(), CommandOptions::default(), tx2);
        thread::sleep(Duration::from_millis(30));

        let (tx3, rx3) = crossbeam_channel::bounded(1);
        session.enqueue("sleep 3".to_string(), CommandOptions::default(), tx3);
        let err = rx3.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(err, Err(SessionError::QueueFull)));
    }
}
