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

//! Transforms raw PTY bytes into the observer-safe normalized form, and
//! post-processes a completed command's raw accumulator into its
//! program-client result. Both passes are deterministic and
//! order-sensitive; the raw copy handed in is never mutated.

use lazy_static::lazy_static;
use regex::Regex;

use crate::consts;

lazy_static! {
    static ref PS1_SETUP_LINE: Regex = Regex::new(r"(?m)^export PS1='[^']*'\r?$\n?").unwrap();
    static ref PS1_FRAGMENT: Regex = Regex::new(r"PS1='[^']*'").unwrap();
    static ref ECHO_DUP: Regex = Regex::new(r"(?m)(\[[^\[\]\n]+\]\$ (.+))\r\n\2\r\n").unwrap();
    static ref ADJACENT_BRACKET_PROMPTS: Regex =
        Regex::new(r"\[[^\[\]\n]+\]\$ (\[[^\[\]\n]+\]\$ )").unwrap();
    static ref TRAILING_NEWLINE_RUN: Regex = Regex::new(r"\r*\n").unwrap();

    static ref LEADING_PROMPT: Regex =
        Regex::new(r"^(?:[\w.-]+@[\w.-]+:\S*[$#>]\s*|\[[^\[\]\n]+\]\$\s*)").unwrap();
    static ref TRAILING_PROMPT: Regex =
        Regex::new(r"(?:[\w.-]+@[\w.-]+:\S*[$#>]\s*|\[[^\[\]\n]+\]\$\s*)$").unwrap();
    static ref BARE_PROMPT_LINE: Regex = Regex::new(r"^(?:\$|#|>)\s*$").unwrap();
    static ref CLASSICAL_PROMPT_LINE: Regex =
        Regex::new(r"^[\w.-]+@[\w.-]+:\S*[$#>]\s*$").unwrap();
    static ref BRACKET_PROMPT_LINE: Regex = Regex::new(r"^\[[^\[\]\n]+\]\$\s*$").unwrap();
}

/// Drops any `\r` that is not immediately followed by `\n`.
fn drop_isolated_cr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '\r' {
            if chars.get(i + 1) == Some(&'\n') {
                out.push(c);
            }
            // else: drop the isolated CR
        } else {
            out.push(c);
        }
    }
    out
}

/// Normalizes every line ending to `CRLF` exactly once.
fn normalize_line_endings(text: &str) -> String {
    TRAILING_NEWLINE_RUN.replace_all(text, "\r\n").into_owned()
}

/// Transforms a raw PTY chunk into its observer/replay-safe normalized
/// form, applying the following steps in order.
pub fn normalize(raw: &[u8]) -> String {
    // Step 1: strip BEL, bracketed-paste toggles, cursor motion, erase
    // line/screen, cursor positioning, alt-screen toggles, app-cursor-keys,
    // all private-mode CSI, and all OSC sequences.
    let stripped = strip_ansi_escapes::strip(raw);
    let mut text = String::from_utf8_lossy(&stripped).into_owned();
    text.retain(|c| c != '\u{7}');

    // Step 2: drop isolated CR.
    text = drop_isolated_cr(&text);

    // Step 3: remove `export PS1='...'` lines and residual `PS1='...'`
    // fragments.
    text = PS1_SETUP_LINE.replace_all(&text, "").into_owned();
    text = PS1_FRAGMENT.replace_all(&text, "").into_owned();

    // Step 4: remove stray handshake residue.
    text = text.replace(consts::HANDSHAKE_RESIDUE, "");

    // Step 5: collapse `[prompt]$ <cmd>\r\n<cmd>\r\n` to `[prompt]$ <cmd>\r\n`.
    text = ECHO_DUP.replace_all(&text, "$1\r\n").into_owned();

    // Step 6: collapse two adjacent bracket prompts.
    text = ADJACENT_BRACKET_PROMPTS.replace_all(&text, "$1").into_owned();

    // Step 7: normalize all line endings to CRLF exactly once.
    normalize_line_endings(&text)
}

/// Post-processes the raw bytes accumulated while a command was running
/// into the `{stdout, stderr, exitCode}` result shape.
pub fn extract_command_result(raw_accum: &[u8], command_text: &str) -> String {
    let stripped = strip_ansi_escapes::strip(raw_accum);
    let mut text = String::from_utf8_lossy(&stripped).into_owned();
    text.retain(|c| c != '\u{7}');
    text = text.replace('\r', "");

    let issued = command_text.trim();

    let mut kept_lines: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == issued {
            continue;
        }
        if BARE_PROMPT_LINE.is_match(trimmed)
            || CLASSICAL_PROMPT_LINE.is_match(trimmed)
            || BRACKET_PROMPT_LINE.is_match(trimmed)
        {
            continue;
        }

        let mut stripped_line = trimmed;
        if let Some(m) = LEADING_PROMPT.find(stripped_line) {
            stripped_line = &stripped_line[m.end()..];
        }
        if let Some(m) = TRAILING_PROMPT.find(stripped_line) {
            stripped_line = &stripped_line[..m.start()];
        }
        kept_lines.push(stripped_line);
    }

    kept_lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_bel_and_osc_title() {
        let raw = b"\x1b]0;my title\x07hello\n";
        let got = normalize(raw);
        assert_eq!(got, "hello\r\n");
    }

    #[test]
    fn strips_bracketed_paste_and_cursor_motion() {
        let raw = b"\x1b[?2004hhello\x1b[2J\x1b[?2004l\n";
        let got = normalize(raw);
        assert_eq!(got, "hello\r\n");
    }

    #[test]
    fn drops_isolated_cr() {
        let got = normalize(b"a\rb\r\nc");
        assert_eq!(got, "ab\r\nc\r\n");
    }

    #[test]
    fn removes_ps1_setup_lines_and_fragments() {
        let raw = b"export PS1='[\\u@\\h \\W]\\$ '\nresidual PS1='leftover' junk\nok\n";
        let got = normalize(raw);
        assert!(!got.contains("PS1="));
        assert!(got.contains("ok"));
    }

    #[test]
    fn removes_handshake_residue() {
        let got = normalize(b"stuff null 2>&1 more\n");
        assert!(!got.contains("null 2>&1"));
    }

    #[test]
    fn collapses_echoed_command() {
        let raw = "[user@host dir]$ echo hi\r\necho hi\r\n".as_bytes();
        let got = normalize(raw);
        assert_eq!(got, "[user@host dir]$ echo hi\r\n");
    }

    #[test]
    fn collapses_adjacent_bracket_prompts() {
        let raw = "[user@host a]$ [user@host b]$ ".as_bytes();
        let got = normalize(raw);
        assert_eq!(got, "[user@host b]$ ");
    }

    #[test]
    fn extract_result_skips_echo_and_prompt() {
        let raw = b"echo alive\r\nalive\r\n[user@host dir]$ ";
        let got = extract_command_result(raw, "echo alive");
        assert_eq!(got, "alive");
    }

    #[test]
    fn extract_result_skips_classical_prompt() {
        let raw = b"echo alive\nalive\nuser@host:~$ ";
        let got = extract_command_result(raw, "echo alive");
        assert_eq!(got, "alive");
    }

    #[test]
    fn extract_result_strips_leading_and_trailing_prompt_fragments() {
        let raw = b"echo alive\n[user@host dir]$ alive\n";
        let got = extract_command_result(raw, "echo alive");
        assert_eq!(got, "alive");
    }
}
