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

//! The data model shared between the queue, replay buffer, fanout and
//! history modules.

use std::time::Duration;

use crate::error::SessionError;

/// Which byte stream an `OutputEntry` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Who caused a command or byte chunk to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    User,
    ProgramClient,
    System,
}

impl Source {
    /// Parses the wire-level `{user, programClient}` source string used by
    /// `execCommand`'s `options.source`. `System` is never accepted from
    /// a caller, only produced internally.
    pub fn parse(raw: &str) -> Result<Source, SessionError> {
        match raw {
            "user" => Ok(Source::User),
            "programClient" => Ok(Source::ProgramClient),
            other => Err(SessionError::InvalidSource(other.to_string())),
        }
    }
}

/// A single normalized chunk of terminal output.
#[derive(Debug, Clone)]
pub struct OutputEntry {
    pub timestamp_ms: i64,
    pub normalized_text: String,
    pub raw_text: Vec<u8>,
    pub stream: Stream,
    pub source: Source,
}

/// A command waiting in, or removed from, the per-session queue.
#[derive(Debug, Clone)]
pub struct CommandOptions {
    pub timeout: Duration,
    pub source: Source,
}

impl Default for CommandOptions {
    fn default() -> Self {
        CommandOptions { timeout: crate::consts::DEFAULT_COMMAND_TIMEOUT, source: Source::ProgramClient }
    }
}

/// The result of a successfully completed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// A record of a command that finished executing.
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub command_text: String,
    pub enqueued_at_ms: i64,
    pub started_at_ms: i64,
    pub duration_ms: i64,
    pub exit_code: i32,
    pub status: CommandStatus,
    pub session_name: String,
    pub source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure,
}

/// One of the four signals `sendSignal` understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Sigint,
    Sigterm,
    Sigquit,
    Sigtstp,
}

impl Signal {
    pub fn parse(name: &str) -> Result<Signal, SessionError> {
        match name {
            "SIGINT" => Ok(Signal::Sigint),
            "SIGTERM" => Ok(Signal::Sigterm),
            "SIGQUIT" => Ok(Signal::Sigquit),
            "SIGTSTP" => Ok(Signal::Sigtstp),
            other => Err(SessionError::UnsupportedSignal(other.to_string())),
        }
    }

    /// The single byte written to the PTY for this signal.
    pub fn byte(self) -> u8 {
        match self {
            Signal::Sigint => 0x03,
            Signal::Sigterm => 0x04,
            Signal::Sigquit => 0x04,
            Signal::Sigtstp => 0x1A,
        }
    }
}

/// One of the three ways `createSession` may authenticate. Resolution
/// priority when a caller somehow supplies more than one is enforced by
/// whoever builds this value, not by the enum itself: inline key text >
/// key file path > password.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    PrivateKeyText { text: String, passphrase: Option<String> },
    KeyFile { path: String, passphrase: Option<String> },
    Password { password: String },
}

/// Raw, possibly-over-specified auth fields as a caller might hand them
/// in (e.g. deserialized straight off the JSON-RPC wire). `resolve`
/// applies the resolution priority -- inline key text > key file path >
/// password -- and is the only place that ordering is allowed to live.
#[derive(Debug, Clone, Default)]
pub struct RawAuth {
    pub private_key_text: Option<String>,
    pub key_file_path: Option<String>,
    pub password: Option<String>,
    pub passphrase: Option<String>,
}

impl RawAuth {
    pub fn resolve(self) -> Result<AuthMethod, SessionError> {
        if let Some(text) = self.private_key_text {
            return Ok(AuthMethod::PrivateKeyText { text, passphrase: self.passphrase });
        }
        if let Some(path) = self.key_file_path {
            return Ok(AuthMethod::KeyFile { path, passphrase: self.passphrase });
        }
        if let Some(password) = self.password {
            return Ok(AuthMethod::Password { password });
        }
        // None of the three supplied: there is no key path to blame, so
        // reuse `InvalidPath` as "no usable auth material was given".
        Err(SessionError::InvalidPath)
    }
}

/// The input to `SessionRegistry::create`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: AuthMethod,
}

/// Returns the current wall-clock time in milliseconds since the epoch,
/// the unit every timestamp in this crate is expressed in.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn signal_mapping() {
        assert_eq!(Signal::parse("SIGINT").unwrap().byte(), 0x03);
        assert_eq!(Signal::parse("SIGTERM").unwrap().byte(), 0x04);
        assert_eq!(Signal::parse("SIGQUIT").unwrap().byte(), 0x04);
        assert_eq!(Signal::parse("SIGTSTP").unwrap().byte(), 0x1A);
        assert!(matches!(Signal::parse("NOPE"), Err(SessionError::UnsupportedSignal(_))));
    }

    #[test]
    fn source_parsing() {
        assert_eq!(Source::parse("user").unwrap(), Source::User);
        assert_eq!(Source::parse("programClient").unwrap(), Source::ProgramClient);
        assert!(matches!(Source::parse("bogus"), Err(SessionError::InvalidSource(_))));
    }
}
