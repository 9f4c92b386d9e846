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

//! Per-session bounded record of executed commands.
//!
//! `getHistory` and `getCommandHistory` are two views over the same
//! bounded ring rather than separate storage: `getHistory` returns every
//! record, `getCommandHistory` returns only the records whose source is
//! `programClient`.

use std::collections::VecDeque;

use crate::model::{CommandRecord, Source};

pub struct CommandHistory {
    cap: usize,
    records: VecDeque<CommandRecord>,
}

impl CommandHistory {
    pub fn new(cap: usize) -> Self {
        CommandHistory { cap, records: VecDeque::with_capacity(cap.min(256)) }
    }

    /// Appends a record, evicting the oldest on overflow.
    pub fn push(&mut self, record: CommandRecord) {
        if self.records.len() >= self.cap {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `getHistory`: a full snapshot copy.
    pub fn snapshot(&self) -> Vec<CommandRecord> {
        self.records.iter().cloned().collect()
    }

    /// `getCommandHistory`: only commands issued by a program client.
    pub fn program_client_snapshot(&self) -> Vec<CommandRecord> {
        self.records.iter().filter(|r| r.source == Source::ProgramClient).cloned().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::CommandStatus;

    fn record(text: &str, source: Source) -> CommandRecord {
        CommandRecord {
            command_text: text.to_string(),
            enqueued_at_ms: 0,
            started_at_ms: 0,
            duration_ms: 0,
            exit_code: 0,
            status: CommandStatus::Success,
            session_name: "s".to_string(),
            source,
        }
    }

    #[test]
    fn evicts_oldest_on_overflow() {
        let mut hist = CommandHistory::new(2);
        hist.push(record("a", Source::User));
        hist.push(record("b", Source::User));
        hist.push(record("c", Source::User));
        let snap = hist.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].command_text, "b");
    }

    #[test]
    fn program_client_view_filters_by_source() {
        let mut hist = CommandHistory::new(10);
        hist.push(record("from-user", Source::User));
        hist.push(record("from-rpc", Source::ProgramClient));
        let snap = hist.program_client_snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].command_text, "from-rpc");
    }
}
