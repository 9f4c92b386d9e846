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

//! The session manager at the heart of a multiplexing SSH session
//! server: it owns a pool of long-lived interactive SSH shell sessions,
//! serializes command execution per session through a bounded queue, and
//! fans raw PTY output out to live observers and a replay buffer.
//!
//! The JSON-RPC framing layer, the observer-socket transport, the CLI
//! entry point, and logging setup are all out of scope here and live in
//! the `sshmux` binary crate (or the collaborator the deployment plugs
//! in); this crate is the `SessionRegistry` and everything it owns.

pub mod config;
pub mod consts;
pub mod error;
pub mod fanout;
pub mod history;
pub mod key_material;
pub mod model;
pub mod prompt;
pub mod queue;
pub mod registry;
pub mod replay;
pub mod sanitize;
pub mod session;
pub mod transport;
pub mod url;
mod user;

use std::time::Duration;

pub use config::Config;
pub use error::SessionError;
pub use fanout::SubscriberId;
pub use model::{
    AuthMethod, CommandOptions, CommandRecord, CommandResult, OutputEntry, RawAuth, Signal, Source,
    SessionConfig,
};
pub use registry::SessionRegistry;

/// Convenience entry point wiring a `Config` straight into a fresh
/// registry: the operations themselves all live on `SessionRegistry`
/// itself, this type exists only to pair it with the `Config` its
/// constructor expects.
pub struct SessionManager {
    pub registry: SessionRegistry,
}

impl SessionManager {
    pub fn new(config: Config) -> Self {
        SessionManager { registry: SessionRegistry::new(config) }
    }

    pub fn create_session(&self, config: SessionConfig) -> Result<(), SessionError> {
        self.registry.create(config)
    }

    pub fn has_session(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    pub fn list_sessions(&self) -> Vec<String> {
        self.registry.list()
    }

    /// Validates `source` before any other work: this check must not be
    /// bypassable by re-ordering, since it is the one security-relevant
    /// check in the whole call.
    pub fn exec_command(
        &self,
        name: &str,
        command_text: String,
        timeout: Option<Duration>,
        source: &str,
    ) -> Result<CommandResult, SessionError> {
        let source = Source::parse(source)?;
        let default_timeout = Duration::from_millis(self.registry.config().default_command_timeout_ms);
        let options = CommandOptions { timeout: timeout.unwrap_or(default_timeout), source };

        let (waiter_tx, waiter_rx) = crossbeam_channel::bounded(1);
        self.registry.with_session(name, |session| {
            session.enqueue(command_text, options, waiter_tx);
        })?;

        waiter_rx.recv().unwrap_or_else(|_| {
            Err(SessionError::SessionDisconnected {
                name: name.to_string(),
                reason: "session actor stopped before replying".to_string(),
            })
        })
    }

    pub fn send_input(&self, name: &str, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.registry.with_session(name, |session| session.send_input(bytes))?
    }

    pub fn send_raw_input(&self, name: &str, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.registry.with_session(name, |session| session.send_raw_input(bytes))?
    }

    pub fn send_signal(&self, name: &str, signal_name: &str) -> Result<(), SessionError> {
        let signal = Signal::parse(signal_name)?;
        self.registry.with_session(name, |session| session.send_signal(signal))?
    }

    pub fn resize(&self, name: &str, cols: i64, rows: i64) -> Result<(), SessionError> {
        if !(1..=1000).contains(&cols) || !(1..=1000).contains(&rows) {
            return Err(SessionError::InvalidDimensions { cols, rows });
        }
        self.registry.with_session(name, |session| session.resize(cols as u32, rows as u32))?
    }

    pub fn get_history(&self, name: &str) -> Result<Vec<CommandRecord>, SessionError> {
        self.registry.with_session(name, |session| session.get_history())
    }

    pub fn get_command_history(&self, name: &str) -> Result<Vec<CommandRecord>, SessionError> {
        self.registry.with_session(name, |session| session.get_command_history())
    }

    pub fn get_observer_url(&self, name: &str) -> Result<String, SessionError> {
        if !self.registry.has(name) {
            return Err(SessionError::SessionNotFound(name.to_string()));
        }
        Ok(url::observer_url(self.registry.config(), name))
    }

    pub fn disconnect(&self, name: &str) -> Result<(), SessionError> {
        self.registry.disconnect(name)
    }

    pub fn cleanup(&self) {
        self.registry.cleanup()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exec_command_validates_source_before_anything_else() {
        let manager = SessionManager::new(Config::default());
        // "ghost" does not exist, but an invalid source must still win:
        // source validation happens before the session lookup.
        let err = manager.exec_command("ghost", "echo hi".to_string(), None, "bogus").unwrap_err();
        assert!(matches!(err, SessionError::InvalidSource(_)));
    }

    #[test]
    fn exec_command_on_unknown_session_fails_after_source_is_valid() {
        let manager = SessionManager::new(Config::default());
        let err = manager.exec_command("ghost", "echo hi".to_string(), None, "user").unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound(_)));
    }

    #[test]
    fn resize_validates_dimensions_before_session_lookup() {
        let manager = SessionManager::new(Config::default());
        let err = manager.resize("ghost", 0, 24).unwrap_err();
        assert!(matches!(err, SessionError::InvalidDimensions { .. }));
        let err = manager.resize("ghost", 24, 1001).unwrap_err();
        assert!(matches!(err, SessionError::InvalidDimensions { .. }));
    }

    #[test]
    fn observer_url_requires_an_existing_session() {
        let manager = SessionManager::new(Config::default());
        assert!(matches!(manager.get_observer_url("ghost"), Err(SessionError::SessionNotFound(_))));
    }

    #[test]
    fn exec_command_falls_back_to_the_configured_default_timeout() {
        let mut config = Config::default();
        config.default_command_timeout_ms = 42_000;
        let manager = SessionManager::new(config);
        // No session exists, so this never reaches the queue, but the
        // fallback timeout is computed before the session lookup and
        // must come from `Config`, not the hardcoded constant.
        let err = manager.exec_command("ghost", "echo hi".to_string(), None, "user").unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound(_)));
        assert_eq!(manager.registry.config().default_command_timeout_ms, 42_000);
    }
}
