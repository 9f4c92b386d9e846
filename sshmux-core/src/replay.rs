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

//! Per-session bounded ring buffer of normalized output entries fed to
//! late-joining observers.

use std::collections::VecDeque;

use crate::model::OutputEntry;

pub struct ReplayBuffer {
    cap: usize,
    entries: VecDeque<OutputEntry>,
}

impl ReplayBuffer {
    pub fn new(cap: usize) -> Self {
        ReplayBuffer { cap, entries: VecDeque::with_capacity(cap.min(256)) }
    }

    /// Appends an entry, evicting the oldest entry on overflow. O(1).
    pub fn push(&mut self, entry: OutputEntry) {
        if self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Replaces the buffer's contents with exactly one entry, used to seed
    /// the replay buffer with the cleaned-up handshake prompt.
    pub fn reset_to(&mut self, entry: OutputEntry) {
        self.entries.clear();
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy of the buffer's contents so callers cannot mutate
    /// internal state.
    pub fn snapshot(&self) -> Vec<OutputEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{Source, Stream};

    fn entry(text: &str) -> OutputEntry {
        OutputEntry {
            timestamp_ms: 0,
            normalized_text: text.to_string(),
            raw_text: text.as_bytes().to_vec(),
            stream: Stream::Stdout,
            source: Source::System,
        }
    }

    #[test]
    fn evicts_oldest_on_overflow() {
        let mut buf = ReplayBuffer::new(2);
        buf.push(entry("a"));
        buf.push(entry("b"));
        buf.push(entry("c"));
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].normalized_text, "b");
        assert_eq!(snap[1].normalized_text, "c");
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut buf = ReplayBuffer::new(10);
        buf.push(entry("a"));
        let mut snap = buf.snapshot();
        snap.push(entry("mutated-only-locally"));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn reset_to_keeps_exactly_one_entry() {
        let mut buf = ReplayBuffer::new(10);
        buf.push(entry("a"));
        buf.push(entry("b"));
        buf.reset_to(entry("[user@host ~]$ "));
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].normalized_text, "[user@host ~]$ ");
    }
}
