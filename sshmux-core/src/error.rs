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

//! The typed, enumerated failure set the core surfaces to callers.
//!
//! Internal plumbing (file IO, thread joins) still reports through
//! `anyhow::Result` the way the teacher's daemon code does; this enum is
//! only the boundary type returned by the public `SessionRegistry`/
//! `ShellSession` operations, so validation errors are never conflated
//! with transport errors even where their wording might overlap.

use std::time::Duration;

/// Every failure an operation on a session or the registry can return.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    // -- Validation --
    #[error("invalid session name: {0}")]
    InvalidName(String),
    #[error("invalid resize dimensions: cols={cols} rows={rows}, must be in [1,1000]")]
    InvalidDimensions { cols: i64, rows: i64 },
    #[error("invalid source: {0:?}, expected \"user\" or \"programClient\"")]
    InvalidSource(String),
    #[error("invalid key path")]
    InvalidPath,
    #[error("command is shell-terminating and was rejected")]
    ShellTerminatingCommandRejected,

    // -- Resource --
    #[error("session name '{0}' is already taken")]
    NameTaken(String),
    #[error("command queue is full")]
    QueueFull,
    #[error("session '{0}' not found")]
    SessionNotFound(String),
    #[error("session '{0}' is not ready")]
    SessionNotReady(String),

    // -- Transport / auth --
    #[error("key file not accessible")]
    KeyFileInaccessible,
    #[error("permission denied accessing key file")]
    KeyFilePermissionDenied,
    #[error("key is encrypted but no passphrase provided")]
    KeyEncryptedNoPassphrase,
    #[error("ssh authentication failed")]
    TransportAuthFailed,
    #[error("connecting to the remote host timed out after {0:?}")]
    ConnectTimeout(Duration),

    // -- Execution --
    #[error("command timed out after {0:?}")]
    CommandTimedOut(Duration),
    #[error("queued command became stale: age {age:?} exceeds max {max:?}")]
    CommandStale { age: Duration, max: Duration },
    #[error("session '{name}' disconnected: {reason}")]
    SessionDisconnected { name: String, reason: String },
    #[error("unsupported signal: {0}")]
    UnsupportedSignal(String),
    #[error("failed to resize pty")]
    ResizeFailed(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
