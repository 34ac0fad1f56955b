/*
 * dot.rs
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

//! SMTP dot transparency (RFC 5321 section 4.5.2).
//!
//! [`DotStuffer`] doubles a `.` at line start and appends the `CRLF.CRLF`
//! terminator. [`DotUnstuffer`] reverses it and recognizes the terminator
//! with at most four bytes of lookahead, so a message body can be streamed
//! off a connection without buffering.

#[derive(Clone, Copy)]
enum StuffState {
    LineStart,
    Normal,
    SawCr,
}

/// Doubles leading dots while streaming a message body out.
pub struct DotStuffer {
    state: StuffState,
}

impl Default for DotStuffer {
    fn default() -> Self {
        // stream start is a line start, so a leading . is doubled too
        Self {
            state: StuffState::LineStart,
        }
    }
}

impl DotStuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform a chunk; `out` receives slices in order.
    pub fn process_chunk<F>(&mut self, chunk: &[u8], mut out: F)
    where
        F: FnMut(&[u8]),
    {
        let mut start = 0;
        for (i, &b) in chunk.iter().enumerate() {
            match self.state {
                StuffState::LineStart => {
                    if b == b'.' {
                        out(&chunk[start..i]);
                        out(b".");
                        start = i;
                    }
                    self.state = match b {
                        b'\r' => StuffState::SawCr,
                        _ => StuffState::Normal,
                    };
                }
                StuffState::Normal => {
                    if b == b'\r' {
                        self.state = StuffState::SawCr;
                    }
                }
                StuffState::SawCr => {
                    self.state = match b {
                        b'\n' => StuffState::LineStart,
                        b'\r' => StuffState::SawCr,
                        _ => StuffState::Normal,
                    };
                }
            }
        }
        if start < chunk.len() {
            out(&chunk[start..]);
        }
    }

    /// Terminate the message: ensure a final CRLF, then `.` CRLF.
    pub fn end_message<F>(&mut self, mut out: F)
    where
        F: FnMut(&[u8]),
    {
        match self.state {
            StuffState::LineStart => out(b".\r\n"),
            StuffState::Normal | StuffState::SawCr => out(b"\r\n.\r\n"),
        }
        self.state = StuffState::LineStart;
    }

    pub fn reset(&mut self) {
        self.state = StuffState::LineStart;
    }
}

/// Result of feeding a chunk to [`DotUnstuffer`].
#[derive(Debug, PartialEq, Eq)]
pub enum FeedResult {
    /// Terminator not seen yet; feed more.
    Continue,
    /// `CRLF.CRLF` recognized; `consumed` bytes of this chunk belong to the
    /// message (terminator included), the rest is the next protocol unit.
    EndOfMessage { consumed: usize },
}

#[derive(Clone, Copy)]
enum UnstuffState {
    LineStart,
    Normal,
    SawCr,
    LineStartDot,
    LineStartDotCr,
}

/// Removes dot stuffing and detects the end-of-message terminator.
pub struct DotUnstuffer {
    state: UnstuffState,
}

impl Default for DotUnstuffer {
    fn default() -> Self {
        Self {
            state: UnstuffState::LineStart,
        }
    }
}

impl DotUnstuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; decoded bytes go to `out`. The terminator itself is
    /// never emitted.
    pub fn feed<F>(&mut self, chunk: &[u8], mut out: F) -> FeedResult
    where
        F: FnMut(&[u8]),
    {
        for (i, &b) in chunk.iter().enumerate() {
            match self.state {
                UnstuffState::LineStart => match b {
                    b'.' => self.state = UnstuffState::LineStartDot,
                    b'\r' => self.state = UnstuffState::SawCr,
                    _ => {
                        out(&[b]);
                        self.state = UnstuffState::Normal;
                    }
                },
                UnstuffState::Normal => {
                    if b == b'\r' {
                        self.state = UnstuffState::SawCr;
                    } else {
                        out(&[b]);
                    }
                }
                UnstuffState::SawCr => {
                    if b == b'\n' {
                        out(b"\r\n");
                        self.state = UnstuffState::LineStart;
                    } else {
                        out(b"\r");
                        if b == b'\r' {
                            // stay in SawCr
                        } else {
                            out(&[b]);
                            self.state = UnstuffState::Normal;
                        }
                    }
                }
                UnstuffState::LineStartDot => match b {
                    b'\r' => self.state = UnstuffState::LineStartDotCr,
                    b'.' => {
                        // stuffed dot collapses to one
                        out(b".");
                        self.state = UnstuffState::Normal;
                    }
                    _ => {
                        // tolerate unstuffed data after a lone dot
                        out(b".");
                        out(&[b]);
                        self.state = UnstuffState::Normal;
                    }
                },
                UnstuffState::LineStartDotCr => {
                    if b == b'\n' {
                        self.state = UnstuffState::LineStart;
                        return FeedResult::EndOfMessage { consumed: i + 1 };
                    }
                    out(b".\r");
                    if b == b'\r' {
                        self.state = UnstuffState::SawCr;
                    } else {
                        out(&[b]);
                        self.state = UnstuffState::Normal;
                    }
                }
            }
        }
        FeedResult::Continue
    }

    /// Emit any bytes held back as potential terminator prefix. Used when a
    /// stream ends without the terminator.
    pub fn finish<F>(&mut self, mut out: F)
    where
        F: FnMut(&[u8]),
    {
        match self.state {
            UnstuffState::SawCr => out(b"\r"),
            UnstuffState::LineStartDot => out(b"."),
            UnstuffState::LineStartDotCr => out(b".\r"),
            _ => {}
        }
        self.state = UnstuffState::LineStart;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stuff(input: &[u8]) -> Vec<u8> {
        let mut s = DotStuffer::new();
        let mut out = Vec::new();
        s.process_chunk(input, |x| out.extend_from_slice(x));
        s.end_message(|x| out.extend_from_slice(x));
        out
    }

    fn unstuff(input: &[u8]) -> (Vec<u8>, FeedResult) {
        let mut u = DotUnstuffer::new();
        let mut out = Vec::new();
        let r = u.feed(input, |x| out.extend_from_slice(x));
        (out, r)
    }

    #[test]
    fn lone_dot_line_is_doubled() {
        assert_eq!(stuff(b"a\r\n.\r\nb"), b"a\r\n..\r\nb\r\n.\r\n");
    }

    #[test]
    fn leading_dot_at_stream_start_is_doubled() {
        assert_eq!(stuff(b".hidden\r\n"), b"..hidden\r\n.\r\n");
    }

    #[test]
    fn terminator_added_after_partial_line() {
        assert_eq!(stuff(b"no newline"), b"no newline\r\n.\r\n");
    }

    #[test]
    fn unstuffer_collapses_doubled_dot() {
        let (out, r) = unstuff(b"a\r\n..\r\nb\r\n.\r\n");
        assert_eq!(out, b"a\r\n.\r\nb\r\n");
        assert_eq!(r, FeedResult::EndOfMessage { consumed: 12 });
    }

    #[test]
    fn terminator_not_part_of_body() {
        let (out, r) = unstuff(b"hello\r\n.\r\nNEXT");
        assert_eq!(out, b"hello\r\n");
        assert_eq!(r, FeedResult::EndOfMessage { consumed: 10 });
    }

    #[test]
    fn round_trip_identity() {
        let bodies: &[&[u8]] = &[
            b"plain\r\nlines\r\n",
            b".\r\n",
            b"..\r\n",
            b"a\r\n.\r\n.b\r\n...\r\n",
            b"",
            b"bare carriage\rreturn\r\n",
        ];
        for body in bodies {
            let wire = stuff(body);
            let mut u = DotUnstuffer::new();
            let mut out = Vec::new();
            let r = u.feed(&wire, |x| out.extend_from_slice(x));
            // the stuffer guarantees a CRLF before the terminator
            let mut expected = body.to_vec();
            if !expected.is_empty() && !expected.ends_with(b"\r\n") {
                expected.extend_from_slice(b"\r\n");
            }
            assert_eq!(out, expected);
            assert!(matches!(r, FeedResult::EndOfMessage { .. }));
        }
    }

    #[test]
    fn terminator_split_across_chunks() {
        let mut u = DotUnstuffer::new();
        let mut out = Vec::new();
        assert_eq!(u.feed(b"x\r\n.", |x| out.extend_from_slice(x)), FeedResult::Continue);
        assert_eq!(u.feed(b"\r", |x| out.extend_from_slice(x)), FeedResult::Continue);
        assert_eq!(
            u.feed(b"\n", |x| out.extend_from_slice(x)),
            FeedResult::EndOfMessage { consumed: 1 }
        );
        assert_eq!(out, b"x\r\n");
    }
}
