/*
 * folding.rs
 * Copyright (C) 2026 Marco Venturi
 *
 * This file is part of Portalettere, an Exchange gateway library.
 *
 * Portalettere is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Portalettere is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Portalettere.  If not, see <http://www.gnu.org/licenses/>.
 */

//! iCalendar line folding (RFC 5545 section 3.1).
//!
//! Unfolding accepts two deviations seen in Exchange output: a continuation
//! starting with `\` (item whose first body character is an escaped
//! newline) and one starting with `:` (Exchange 2010 emits a timezone
//! property broken before the colon; the colon is kept).

/// Fold width in octets, excluding the CRLF.
const FOLD_WIDTH: usize = 75;

/// Split folded input into logical lines.
pub fn unfold_lines(input: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in input.split("\r\n").flat_map(|s| s.split('\n')) {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.is_empty() {
            continue;
        }
        let first = raw.as_bytes()[0];
        let continuation = matches!(first, b' ' | b'\t' | b'\\' | b':');
        match (continuation, lines.last_mut()) {
            (true, Some(last)) => {
                if first == b':' {
                    last.push_str(raw);
                } else if first == b'\\' {
                    last.push_str(raw);
                } else {
                    last.push_str(&raw[1..]);
                }
            }
            _ => lines.push(raw.to_string()),
        }
    }
    lines
}

/// Largest prefix of `s` at most `max` octets, split on a char boundary.
fn split_at_octet_limit(s: &str, max: usize) -> (&str, &str) {
    if s.len() <= max {
        return (s, "");
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.split_at(end)
}

/// Writes logical lines folded at 75 octets with CRLF terminators.
pub struct FoldingWriter {
    out: String,
}

impl Default for FoldingWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FoldingWriter {
    pub fn new() -> Self {
        Self { out: String::new() }
    }

    pub fn write_line(&mut self, line: &str) {
        let (head, mut rest) = split_at_octet_limit(line, FOLD_WIDTH);
        self.out.push_str(head);
        self.out.push_str("\r\n");
        while !rest.is_empty() {
            // continuation lines lose one octet to the leading space
            let (head, tail) = split_at_octet_limit(rest, FOLD_WIDTH - 1);
            self.out.push(' ');
            self.out.push_str(head);
            self.out.push_str("\r\n");
            rest = tail;
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_line_passes_through() {
        let mut w = FoldingWriter::new();
        w.write_line("BEGIN:VCALENDAR");
        assert_eq!(w.into_string(), "BEGIN:VCALENDAR\r\n");
    }

    #[test]
    fn long_line_folds_at_75_octets() {
        let value: String = std::iter::repeat('x').take(200).collect();
        let mut w = FoldingWriter::new();
        w.write_line(&format!("DESCRIPTION:{}", value));
        let folded = w.into_string();
        for physical in folded.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(physical.len() <= 75, "line too long: {}", physical.len());
        }
        let logical = unfold_lines(&folded);
        assert_eq!(logical.len(), 1);
        assert_eq!(logical[0], format!("DESCRIPTION:{}", value));
    }

    #[test]
    fn folding_respects_utf8_boundaries() {
        let value: String = std::iter::repeat('\u{00e9}').take(100).collect();
        let mut w = FoldingWriter::new();
        w.write_line(&format!("SUMMARY:{}", value));
        let folded = w.into_string();
        // must not split a 2-byte sequence
        assert!(std::str::from_utf8(folded.as_bytes()).is_ok());
        assert_eq!(unfold_lines(&folded)[0], format!("SUMMARY:{}", value));
    }

    #[test]
    fn backslash_continuation_appended_verbatim() {
        let lines = unfold_lines("DESCRIPTION:start\r\n\\nrest\r\n");
        assert_eq!(lines, vec!["DESCRIPTION:start\\nrest"]);
    }

    #[test]
    fn colon_continuation_keeps_colon() {
        let lines = unfold_lines("TZID\r\n:Europe/Paris\r\n");
        assert_eq!(lines, vec!["TZID:Europe/Paris"]);
    }

    #[test]
    fn tab_continuation_strips_one_char() {
        let lines = unfold_lines("SUMMARY:part\r\n\tone\r\n");
        assert_eq!(lines, vec!["SUMMARY:partone"]);
    }
}
