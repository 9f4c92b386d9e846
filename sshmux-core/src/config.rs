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

use std::{fs, path::PathBuf};

use anyhow::Context;
use serde_derive::Deserialize;
use tracing::{info, instrument};

use crate::{consts, user};

/// Reads the session manager's tunables from a TOML file, falling back to
/// `~/.config/sshmux/config.toml` and then to defaults, the same
/// resolution order as the teacher's `read_config` (`libshpool/src/config.rs`).
#[instrument(skip_all)]
pub fn read_config(config_file: &Option<String>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    if let Some(config_path) = config_file {
        info!("parsing explicitly passed in config ({})", config_path);
        let config_str = fs::read_to_string(config_path).context("reading config toml (1)")?;
        config = toml::from_str(&config_str).context("parsing config file (1)")?;
    } else {
        let home_dir = user::home_dir()?;
        let mut config_path = PathBuf::from(home_dir);
        config_path.push(".config");
        config_path.push("sshmux");
        config_path.push("config.toml");
        if config_path.exists() {
            let config_str = fs::read_to_string(config_path).context("reading config toml (2)")?;
            config = toml::from_str(&config_str).context("parsing config file (2)")?;
        }
    }

    Ok(config)
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Bound on the per-session replay buffer. Defaults to
    /// `consts::MAX_OUTPUT_BUFFER`.
    pub max_output_buffer: usize,

    /// Bound on the per-session command history. Defaults to
    /// `consts::MAX_HISTORY`.
    pub max_history: usize,

    /// Bound on the per-session pending command queue. Defaults to
    /// `consts::MAX_QUEUE_SIZE`.
    pub max_queue_size: usize,

    /// Age, in milliseconds, past which a queued command is evicted as
    /// stale. Defaults to `consts::MAX_COMMAND_AGE`.
    pub max_command_age_ms: u64,

    /// Default per-command timeout, in milliseconds, when a caller does
    /// not supply `options.timeoutMs`. Defaults to
    /// `consts::DEFAULT_COMMAND_TIMEOUT`.
    pub default_command_timeout_ms: u64,

    /// Scheme + host the observer URL is built against.
    pub observer_host: String,

    /// Port the observer-socket transport listens on; used only to build
    /// `UrlResolver` output, since the transport itself is out of scope.
    pub observer_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_output_buffer: consts::MAX_OUTPUT_BUFFER,
            max_history: consts::MAX_HISTORY,
            max_queue_size: consts::MAX_QUEUE_SIZE,
            max_command_age_ms: consts::MAX_COMMAND_AGE.as_millis() as u64,
            default_command_timeout_ms: consts::DEFAULT_COMMAND_TIMEOUT.as_millis() as u64,
            observer_host: "localhost".to_string(),
            observer_port: 9000,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_partial() -> anyhow::Result<()> {
        let cases = vec![
            r#"max_queue_size = 10"#,
            r#"
            observer_host = "example.com"
            observer_port = 9001
            "#,
            r#""#,
        ];

        for case in cases.into_iter() {
            let _: Config = toml::from_str(case)?;
        }

        Ok(())
    }

    #[test]
    fn defaults_match_consts() {
        let config = Config::default();
        assert_eq!(config.max_output_buffer, consts::MAX_OUTPUT_BUFFER);
        assert_eq!(config.max_history, consts::MAX_HISTORY);
        assert_eq!(config.max_queue_size, consts::MAX_QUEUE_SIZE);
    }
}
