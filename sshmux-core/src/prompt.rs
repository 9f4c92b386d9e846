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

//! Recognizes a shell prompt at the tail of a byte stream.
//!
//! Detection is purely byte-pattern based; there is no shell-state
//! tracking, so a remote program that prints `$ ` at the tail of its own
//! output will be mistaken for command completion. This is a known,
//! accepted limitation, not a bug to fix here.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // user@host[:]dir$ / # / >, optionally with no user@host prefix at all.
    static ref GENERIC_PROMPT: Regex =
        Regex::new(r"(?:[\w.-]+@[\w.-]+[:\s][^\n]*)?[$#>]\s*$").unwrap();
    static ref BRACKET_PROMPT: Regex = Regex::new(r"\[[^\[\]\n]+\]\$\s*$").unwrap();
}

/// Returns the last two `\n`-separated lines of `buf`, most recent last.
fn tail_lines(buf: &str) -> Vec<&str> {
    let lines: Vec<&str> = buf.split('\n').collect();
    let start = lines.len().saturating_sub(2);
    lines[start..].to_vec()
}

/// True if either of the last two lines ends with a generic shell prompt,
/// or contains `$ `, `# `, or `> ` anywhere as a fallback.
pub fn has_prompt(buf: &str) -> bool {
    for line in tail_lines(buf) {
        let trimmed = line.trim_end_matches('\r');
        if GENERIC_PROMPT.is_match(trimmed) {
            return true;
        }
        if trimmed.contains("$ ") || trimmed.contains("# ") || trimmed.contains("> ") {
            return true;
        }
    }
    false
}

/// True only for the specific `[user@host dir]$` pattern at the tail of
/// one of the last two lines.
pub fn has_bracket_prompt(buf: &str) -> bool {
    tail_lines(buf).iter().any(|line| BRACKET_PROMPT.is_match(line.trim_end_matches('\r')))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detects_generic_prompt() {
        assert!(has_prompt("some output\nuser@host:~$ "));
        assert!(has_prompt("some output\n$ "));
        assert!(has_prompt("some output\n# "));
    }

    #[test]
    fn detects_fallback_anywhere() {
        assert!(has_prompt("weird output with $ in the middle\nmore text"));
    }

    #[test]
    fn detects_bracket_prompt_only_for_bracket_form() {
        assert!(has_bracket_prompt("blah\n[user@host dir]$ "));
        assert!(!has_bracket_prompt("blah\nuser@host:~$ "));
    }

    #[test]
    fn no_prompt_in_plain_output() {
        assert!(!has_prompt("just some\nregular output lines"));
        assert!(!has_bracket_prompt("just some\nregular output lines"));
    }
}
