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

//! The bounded per-session command FIFO.
//!
//! `CommandQueue` is plain data manipulated exclusively by its owning
//! `ShellSession` actor thread, so it needs no internal locking of its
//! own -- the atomicity the "check executing, pop head, set executing"
//! decision step needs comes from that single-owner discipline, not from
//! a mutex inside this type.

use std::{collections::VecDeque, time::Duration};

use crossbeam_channel::Sender;

use crate::{
    error::SessionError,
    model::{CommandOptions, CommandResult},
};

/// The other end of a queued command's completion channel. Resolved
/// exactly once, by whichever of enqueue-time rejection, staleness
/// eviction, timeout, disconnect, or normal completion reaches the
/// command first.
pub type Waiter = Sender<Result<CommandResult, SessionError>>;

pub struct QueuedCommand {
    pub command_text: String,
    pub options: CommandOptions,
    pub enqueued_at_ms: i64,
    pub waiter: Waiter,
}

pub struct CommandQueue {
    cap: usize,
    entries: VecDeque<QueuedCommand>,
}

impl CommandQueue {
    pub fn new(cap: usize) -> Self {
        CommandQueue { cap, entries: VecDeque::with_capacity(cap.min(256)) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.cap
    }

    /// Appends a command, or returns `QueueFull` without mutating the
    /// queue.
    pub fn push(&mut self, cmd: QueuedCommand) -> Result<(), QueuedCommand> {
        if self.is_full() {
            return Err(cmd);
        }
        self.entries.push_back(cmd);
        Ok(())
    }

    /// Evicts every entry older than `max_age` as of `now_ms`, failing
    /// each evicted waiter with `CommandStale` describing its actual age.
    /// Runs before the head is selected, so a stale entry is never handed
    /// to the transport.
    pub fn evict_stale(&mut self, now_ms: i64, max_age: Duration) {
        let max_age_ms = max_age.as_millis() as i64;
        while let Some(front) = self.entries.front() {
            let age_ms = now_ms - front.enqueued_at_ms;
            if age_ms <= max_age_ms {
                break;
            }
            let stale = self.entries.pop_front().expect("front just peeked");
            let age = Duration::from_millis(age_ms.max(0) as u64);
            let _ = stale.waiter.send(Err(SessionError::CommandStale { age, max: max_age }));
        }
    }

    /// Removes and returns the head of the queue, if any, after staleness
    /// eviction has already run.
    pub fn pop_front(&mut self) -> Option<QueuedCommand> {
        self.entries.pop_front()
    }

    /// Fails every remaining waiter with a disconnect reason and empties
    /// the queue.
    pub fn drain_with_disconnect_error(&mut self, session_name: &str, reason: &str) {
        for entry in self.entries.drain(..) {
            let _ = entry.waiter.send(Err(SessionError::SessionDisconnected {
                name: session_name.to_string(),
                reason: reason.to_string(),
            }));
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::model::Source;

    fn cmd(text: &str, enqueued_at_ms: i64) -> (QueuedCommand, crossbeam_channel::Receiver<Result<CommandResult, SessionError>>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            QueuedCommand {
                command_text: text.to_string(),
                options: CommandOptions { timeout: Duration::from_secs(15), source: Source::ProgramClient },
                enqueued_at_ms,
                waiter: tx,
            },
            rx,
        )
    }

    #[test]
    fn push_respects_capacity() {
        let mut q = CommandQueue::new(1);
        let (c1, _rx1) = cmd("a", 0);
        assert!(q.push(c1).is_ok());
        let (c2, _rx2) = cmd("b", 0);
        assert!(q.push(c2).is_err());
    }

    #[test]
    fn evict_stale_fails_old_entries_in_order() {
        let mut q = CommandQueue::new(10);
        let (c1, rx1) = cmd("old", 0);
        let (c2, rx2) = cmd("fresh", 299_000);
        q.push(c1).unwrap();
        q.push(c2).unwrap();

        q.evict_stale(300_001, Duration::from_millis(300_000));

        let result = rx1.try_recv().unwrap();
        assert!(matches!(result, Err(SessionError::CommandStale { .. })));
        assert!(rx2.try_recv().is_err());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn drain_with_disconnect_fails_all_waiters() {
        let mut q = CommandQueue::new(10);
        let (c1, rx1) = cmd("a", 0);
        let (c2, rx2) = cmd("b", 0);
        q.push(c1).unwrap();
        q.push(c2).unwrap();

        q.drain_with_disconnect_error("s1", "Session 's1' disconnected");

        assert!(matches!(rx1.try_recv().unwrap(), Err(SessionError::SessionDisconnected { .. })));
        assert!(matches!(rx2.try_recv().unwrap(), Err(SessionError::SessionDisconnected { .. })));
        assert!(q.is_empty());
    }
}
