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

use std::time::Duration;

/// Bound on the per-session replay buffer.
pub const MAX_OUTPUT_BUFFER: usize = 1000;

/// Bound on the per-session command history.
pub const MAX_HISTORY: usize = 100;

/// Bound on the per-session pending command queue.
pub const MAX_QUEUE_SIZE: usize = 100;

/// A queued command older than this is evicted as stale instead of run.
pub const MAX_COMMAND_AGE: Duration = Duration::from_millis(300_000);

/// Default `options.timeoutMs` for a queued command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(15_000);

/// How long the init handshake may take before the connection is aborted
/// and the session is not created.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settle delay after the bracket prompt is observed during the init
/// handshake, before the session is marked ready.
pub const HANDSHAKE_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Path prefixes a resolved key file may never live under.
pub const FORBIDDEN_KEY_PATH_PREFIXES: &[&str] = &["/etc", "/proc", "/sys", "/dev", "/boot", "/root"];

/// Longest path string `KeyMaterialLoader::load_key` will accept.
pub const MAX_KEY_PATH_LEN: usize = 4096;

/// Read buffer size used when draining PTY bytes.
pub const BUF_SIZE: usize = 1024 * 16;

/// Environment handed to the remote shell during the init handshake.
pub const REMOTE_TERM: &str = "xterm-256color";
pub const REMOTE_SHELL: &str = "/bin/bash";

/// Default PTY geometry.
pub const DEFAULT_COLS: u32 = 80;
pub const DEFAULT_ROWS: u32 = 24;

/// Command text the shell-init handshake sends to set up a parseable
/// bracket prompt.
pub const PS1_SETUP_CMD: &str = "export PS1='[\\u@\\h \\W]\\$ '\n";

/// Handshake residue fragment that is filtered out of the init buffer and
/// of the replay stream.
pub const HANDSHAKE_RESIDUE: &str = "null 2>&1";
