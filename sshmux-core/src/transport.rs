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

//! The SSH client + interactive shell channel seam.
//!
//! `ShellSession` drives the remote shell through the `Transport` trait
//! rather than talking to `ssh2` directly, the same seam the teacher
//! keeps between `daemon::shell::SessionInner` and `shpool_pty::fork::Fork`
//! -- it is what lets the scheduler and handshake logic in `session.rs` run
//! against `transport::fake` in tests, without a live sshd.

use std::io;

/// The non-blocking, byte-oriented channel a `ShellSession` drives.
///
/// All real implementations of this trait (and the fake one) are
/// non-blocking: `read` returns `Ok(0)` when no bytes are currently
/// available rather than parking the calling thread, so the owning
/// session actor can interleave PTY reads with control-channel polling.
pub trait Transport: Send {
    /// Reads available bytes into `buf`, returning `Ok(0)` if none are
    /// currently available. Once the remote shell has exited this keeps
    /// returning `Ok(0)`; check `eof()` to distinguish "no data yet" from
    /// "nothing will ever arrive again".
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes the entirety of `data`, blocking the calling thread (but
    /// not the whole session actor, since writes only happen from the
    /// owning thread) until every byte is accepted by the channel.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Sends a window-change request for the PTY.
    fn resize(&mut self, cols: u32, rows: u32) -> io::Result<()>;

    /// True once the remote shell has exited and no more bytes will ever
    /// be produced by `read`.
    fn eof(&self) -> bool;

    /// Best-effort teardown; never panics, errors are swallowed the way
    /// `SessionRegistry::disconnect` swallows channel-close failures.
    fn close(&mut self);
}

/// The real `ssh2`-backed implementation.
pub mod ssh {
    use std::{io, net::TcpStream, time::Duration};

    use ssh2::Session as Ssh2Session;
    use tracing::instrument;

    use super::Transport;
    use crate::{consts, error::SessionError, key_material, model::AuthMethod, model::SessionConfig};

    /// One SSH client plus the interactive shell channel opened on it.
    /// `session` has no direct callers after `connect` returns, but
    /// `channel` holds an internal reference-counted handle into it, so
    /// it has to outlive `channel` -- keeping it here is what guarantees
    /// that.
    pub struct Ssh2Transport {
        #[allow(dead_code)]
        session: Ssh2Session,
        channel: ssh2::Channel,
    }

    impl Ssh2Transport {
        /// Opens the TCP connection, runs the SSH handshake and auth,
        /// opens a shell channel with a PTY, and puts the session into
        /// non-blocking mode.
        #[instrument(skip(config), fields(host = %config.host, username = %config.username))]
        pub fn connect(config: &SessionConfig) -> Result<Self, SessionError> {
            let addr = format!("{}:{}", config.host, config.port);
            let tcp = TcpStream::connect(&addr)
                .map_err(|_| SessionError::ConnectTimeout(consts::CONNECT_TIMEOUT))?;
            let _ = tcp.set_read_timeout(Some(consts::CONNECT_TIMEOUT));
            let _ = tcp.set_write_timeout(Some(consts::CONNECT_TIMEOUT));

            let mut session = Ssh2Session::new().map_err(|_| SessionError::TransportAuthFailed)?;
            session.set_tcp_stream(tcp);
            session
                .handshake()
                .map_err(|_| SessionError::ConnectTimeout(consts::CONNECT_TIMEOUT))?;

            authenticate(&mut session, config)?;
            if !session.authenticated() {
                return Err(SessionError::TransportAuthFailed);
            }

            let mut channel =
                session.channel_session().map_err(|_| SessionError::TransportAuthFailed)?;
            channel
                .request_pty(
                    consts::REMOTE_TERM,
                    None,
                    Some((consts::DEFAULT_COLS, consts::DEFAULT_ROWS, 0, 0)),
                )
                .map_err(|_| SessionError::TransportAuthFailed)?;
            // Best-effort: most sshd configs only forward a handful of
            // AcceptEnv names, so a rejection here is not fatal to the
            // session the way a PTY or auth failure would be.
            let _ = channel.setenv("TERM", consts::REMOTE_TERM);
            let _ = channel.setenv("SHELL", consts::REMOTE_SHELL);
            channel.shell().map_err(|_| SessionError::TransportAuthFailed)?;

            session.set_blocking(false);

            Ok(Ssh2Transport { session, channel })
        }
    }

    /// Authenticates in priority order: inline key text, then key file
    /// path, then password. Key material flows through
    /// `key_material::load_key` in both key cases so path-safety and
    /// encryption checks apply uniformly, then is handed to libssh2 as
    /// an in-memory key via `userauth_pubkey_memory` -- there is no key
    /// file on disk for the `PrivateKeyText` case to begin with.
    fn authenticate(session: &mut Ssh2Session, config: &SessionConfig) -> Result<(), SessionError> {
        match &config.auth {
            AuthMethod::PrivateKeyText { text, passphrase } => {
                if key_material::is_encrypted(text.as_bytes()) && passphrase.is_none() {
                    return Err(SessionError::KeyEncryptedNoPassphrase);
                }
                session
                    .userauth_pubkey_memory(&config.username, None, text, passphrase.as_deref())
                    .map_err(|_| SessionError::TransportAuthFailed)
            }
            AuthMethod::KeyFile { path, passphrase } => {
                let key_bytes = key_material::load_key(path, passphrase.as_deref())?;
                let key_text =
                    String::from_utf8(key_bytes).map_err(|_| SessionError::KeyFileInaccessible)?;
                session
                    .userauth_pubkey_memory(
                        &config.username,
                        None,
                        &key_text,
                        passphrase.as_deref(),
                    )
                    .map_err(|_| SessionError::TransportAuthFailed)
            }
            AuthMethod::Password { password } => session
                .userauth_password(&config.username, password)
                .map_err(|_| SessionError::TransportAuthFailed),
        }
    }

    impl Transport for Ssh2Transport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            use std::io::Read;
            match self.channel.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
                Err(e) => Err(e),
            }
        }

        fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
            use std::io::Write;
            while !data.is_empty() {
                match self.channel.write(data) {
                    Ok(0) => {}
                    Ok(n) => data = &data[n..],
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        }

        fn resize(&mut self, cols: u32, rows: u32) -> io::Result<()> {
            self.channel
                .request_pty_size(cols, rows, None, None)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
        }

        fn eof(&self) -> bool {
            self.channel.eof()
        }

        fn close(&mut self) {
            let _ = self.channel.close();
            let _ = self.channel.wait_close();
        }
    }
}

/// A fake in-memory transport standing in for a live SSH connection, so
/// the scheduler, demux and handshake logic in `session.rs` can be
/// exercised without a real sshd (the same role the teacher's tests give
/// a real, locally-spawned `/bin/sh` -- this crate has no local PTY to
/// spawn one against, so the fake shell itself is scripted instead).
pub mod fake {
    use std::{collections::VecDeque, io};

    use super::Transport;

    /// What a scripted command line produces before the next prompt.
    #[derive(Debug, Clone, Default)]
    pub struct FakeOutput {
        pub stdout: String,
        /// If set, the shell "hangs" and never prints a prompt for this
        /// command, so the owning `ShellSession` can be driven into a
        /// timeout or a pending-at-disconnect state in tests.
        pub withhold_prompt: bool,
    }

    impl FakeOutput {
        pub fn text(stdout: impl Into<String>) -> Self {
            FakeOutput { stdout: stdout.into(), withhold_prompt: false }
        }

        pub fn hang() -> Self {
            FakeOutput { stdout: String::new(), withhold_prompt: true }
        }
    }

    /// A minimal scripted shell: it echoes every line it receives (real
    /// PTYs echo input), recognizes the handshake's `PS1` setup command,
    /// and otherwise looks a scripted command up in `responses` to decide
    /// what to print before the next prompt.
    pub struct FakeTransport {
        outbox: VecDeque<u8>,
        inbuf: Vec<u8>,
        prompt: String,
        closed: bool,
        hanging: bool,
        responses: Box<dyn FnMut(&str) -> FakeOutput + Send>,
        pub last_resize: Option<(u32, u32)>,
        pub received_signals: Vec<u8>,
    }

    impl FakeTransport {
        /// Builds a fake that looks commands up in `responses`, seeded
        /// with the initial banner a real shell prints before any prompt
        /// configuration (so `PromptDetector::has_prompt` has something
        /// to find in handshake step 1).
        pub fn new<F>(responses: F) -> Self
        where
            F: FnMut(&str) -> FakeOutput + Send + 'static,
        {
            let mut outbox = VecDeque::new();
            outbox.extend(b"Welcome\r\nuser@host:~$ ".iter().copied());
            FakeTransport {
                outbox,
                inbuf: Vec::new(),
                prompt: "user@host:~$ ".to_string(),
                closed: false,
                hanging: false,
                responses: Box::new(responses),
                last_resize: None,
                received_signals: Vec::new(),
            }
        }

        /// A fake with no scripted commands; anything sent just gets
        /// echoed and immediately re-prompted with empty output.
        pub fn empty() -> Self {
            FakeTransport::new(|_| FakeOutput::default())
        }

        fn handle_line(&mut self, line: &str) {
            self.outbox.extend(line.as_bytes().iter().copied());
            self.outbox.extend(b"\r\n".iter().copied());

            if line.trim() == crate::consts::PS1_SETUP_CMD.trim_end_matches('\n') {
                self.prompt = "[user@host ~]$ ".to_string();
                self.outbox.extend(self.prompt.as_bytes().iter().copied());
                return;
            }

            let output = (self.responses)(line);
            if !output.stdout.is_empty() {
                self.outbox.extend(output.stdout.as_bytes().iter().copied());
                if !output.stdout.ends_with('\n') {
                    self.outbox.extend(b"\r\n".iter().copied());
                }
            }
            if output.withhold_prompt {
                self.hanging = true;
            } else {
                self.outbox.extend(self.prompt.as_bytes().iter().copied());
            }
        }
    }

    impl Transport for FakeTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.outbox.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.outbox.pop_front().expect("checked len above");
            }
            Ok(n)
        }

        fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            if self.closed {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "fake transport closed"));
            }
            for &byte in data {
                if byte == b'\n' {
                    let line = String::from_utf8_lossy(&self.inbuf).into_owned();
                    self.inbuf.clear();
                    if byte == 0x03 || byte == 0x04 || byte == 0x1A {
                        self.received_signals.push(byte);
                    } else {
                        self.handle_line(&line);
                    }
                } else if byte == 0x03 || byte == 0x04 || byte == 0x1A {
                    // A bare control byte (no trailing newline) is a
                    // signal injected via sendSignal, not a command line.
                    self.received_signals.push(byte);
                } else {
                    self.inbuf.push(byte);
                }
            }
            Ok(())
        }

        fn resize(&mut self, cols: u32, rows: u32) -> io::Result<()> {
            self.last_resize = Some((cols, rows));
            Ok(())
        }

        fn eof(&self) -> bool {
            self.closed
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[cfg(test)]
    mod test {
        use super::*;

        fn drain(t: &mut FakeTransport) -> String {
            let mut buf = [0u8; 4096];
            let mut out = Vec::new();
            loop {
                let n = t.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n]);
            }
            String::from_utf8_lossy(&out).into_owned()
        }

        #[test]
        fn emits_initial_banner_with_generic_prompt() {
            let mut t = FakeTransport::empty();
            let got = drain(&mut t);
            assert!(got.ends_with("user@host:~$ "));
        }

        #[test]
        fn ps1_setup_switches_to_bracket_prompt() {
            let mut t = FakeTransport::empty();
            let _ = drain(&mut t);
            t.write_all(crate::consts::PS1_SETUP_CMD.as_bytes()).unwrap();
            let got = drain(&mut t);
            assert!(got.trim_end().ends_with("[user@host ~]$"));
        }

        #[test]
        fn scripted_command_echoes_and_prints_output() {
            let mut t = FakeTransport::new(|cmd| {
                if cmd.trim() == "echo hi" {
                    FakeOutput::text("hi")
                } else {
                    FakeOutput::default()
                }
            });
            let _ = drain(&mut t);
            t.write_all(crate::consts::PS1_SETUP_CMD.as_bytes()).unwrap();
            let _ = drain(&mut t);
            t.write_all(b"echo hi\n").unwrap();
            let got = drain(&mut t);
            assert!(got.contains("echo hi"));
            assert!(got.contains("hi"));
            assert!(got.trim_end().ends_with("[user@host ~]$"));
        }

        #[test]
        fn hanging_command_withholds_prompt() {
            let mut t = FakeTransport::new(|_| FakeOutput::hang());
            let _ = drain(&mut t);
            t.write_all(crate::consts::PS1_SETUP_CMD.as_bytes()).unwrap();
            let _ = drain(&mut t);
            t.write_all(b"sleep 999\n").unwrap();
            let got = drain(&mut t);
            assert!(!got.contains('$'));
        }

        #[test]
        fn signal_byte_is_recorded_not_echoed() {
            let mut t = FakeTransport::empty();
            let _ = drain(&mut t);
            t.write_all(&[0x03]).unwrap();
            assert_eq!(t.received_signals, vec![0x03]);
        }

        #[test]
        fn resize_is_recorded() {
            let mut t = FakeTransport::empty();
            t.resize(120, 40).unwrap();
            assert_eq!(t.last_resize, Some((120, 40)));
        }

        #[test]
        fn write_after_close_fails() {
            let mut t = FakeTransport::empty();
            t.close();
            assert!(t.write_all(b"x\n").is_err());
        }
    }
}
