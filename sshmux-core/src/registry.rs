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

//! Process-wide mapping from session name to `ShellSession`.
//!
//! The map itself is the only structure shared across sessions; its
//! mutations are serialized behind a `Mutex`, the same way the teacher's
//! daemon guards its session table in `daemon::server::Server`.
//! Everything inside one `ShellSession` is reached from there on, never
//! locked again at this layer.

use std::{collections::HashMap, sync::Mutex};

use tracing::{info, instrument};

use crate::{
    config::Config,
    error::SessionError,
    key_material,
    model::SessionConfig,
    session::ShellSession,
    transport::ssh::Ssh2Transport,
};

/// Validates a session name: non-empty, no embedded whitespace, no `@`,
/// no leading/trailing whitespace.
pub fn validate_name(name: &str) -> Result<(), SessionError> {
    if name.is_empty() {
        return Err(SessionError::InvalidName(name.to_string()));
    }
    if name != name.trim() {
        return Err(SessionError::InvalidName(name.to_string()));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '@') {
        return Err(SessionError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub struct SessionRegistry {
    config: Config,
    sessions: Mutex<HashMap<String, ShellSession>>,
}

impl SessionRegistry {
    pub fn new(config: Config) -> Self {
        SessionRegistry { config, sessions: Mutex::new(HashMap::new()) }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validates the name, enforces uniqueness, validates the auth
    /// material, opens the transport, runs the init handshake, and
    /// registers the new session -- or tears everything down and returns
    /// an error.
    #[instrument(skip(self, config), fields(name = %config.name, host = %config.host))]
    pub fn create(&self, config: SessionConfig) -> Result<(), SessionError> {
        validate_name(&config.name)?;

        {
            let sessions = self.sessions.lock().unwrap();
            if sessions.contains_key(&config.name) {
                return Err(SessionError::NameTaken(config.name.clone()));
            }
        }

        // Check the auth material before dialing out: a bad key path must
        // fail the same way regardless of whether the host is reachable,
        // not race a TCP timeout.
        key_material::validate_auth(&config.auth)?;

        let transport = Ssh2Transport::connect(&config)?;
        let session = ShellSession::start(
            config.name.clone(),
            config.host.clone(),
            Box::new(transport),
            self.config.max_output_buffer,
            self.config.max_history,
            self.config.max_queue_size,
            std::time::Duration::from_millis(self.config.max_command_age_ms),
        )?;

        let mut sessions = self.sessions.lock().unwrap();
        // Another `create` for the same name could have slipped in while
        // this one was connecting; the key-material and transport I/O
        // above happens outside the lock, so re-check uniqueness before
        // inserting.
        if sessions.contains_key(&config.name) {
            return Err(SessionError::NameTaken(config.name));
        }
        info!("session created");
        sessions.insert(config.name, session);
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(name)
    }

    /// Test-only seam: registers an already-built `ShellSession` without
    /// dialing a real transport, so higher-level registry/manager
    /// behavior can be exercised against `transport::fake` the same way
    /// `session.rs`'s own unit tests do.
    #[cfg(any(test, feature = "test-util"))]
    pub fn insert_for_test(&self, session: ShellSession) {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(session.name().to_string(), session);
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn with_session<T>(&self, name: &str, f: impl FnOnce(&ShellSession) -> T) -> Result<T, SessionError> {
        let sessions = self.sessions.lock().unwrap();
        let session = sessions.get(name).ok_or_else(|| SessionError::SessionNotFound(name.to_string()))?;
        Ok(f(session))
    }

    /// Broadcasts the synthetic close entry, fails every waiter, ends the
    /// channel, and removes the entry.
    #[instrument(skip(self))]
    pub fn disconnect(&self, name: &str) -> Result<(), SessionError> {
        let mut session = {
            let mut sessions = self.sessions.lock().unwrap();
            sessions.remove(name).ok_or_else(|| SessionError::SessionNotFound(name.to_string()))?
        };
        session.disconnect(format!("Session '{name}' disconnected"));
        info!("session disconnected");
        Ok(())
    }

    /// Disconnects every entry.
    pub fn cleanup(&self) {
        let names: Vec<String> = self.sessions.lock().unwrap().keys().cloned().collect();
        for name in names {
            let _ = self.disconnect(&name);
        }
    }
}

impl Drop for SessionRegistry {
    /// No session outlives the registry that created it.
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_invalid_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name(" leading").is_err());
        assert!(validate_name("trailing ").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("has@at").is_err());
        assert!(validate_name("fine-name").is_ok());
    }

    #[test]
    fn list_is_empty_for_a_fresh_registry() {
        let registry = SessionRegistry::new(Config::default());
        assert!(registry.list().is_empty());
        assert!(!registry.has("anything"));
    }

    #[test]
    fn disconnect_of_unknown_session_fails() {
        let registry = SessionRegistry::new(Config::default());
        let err = registry.disconnect("ghost").unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound(_)));
    }
}
