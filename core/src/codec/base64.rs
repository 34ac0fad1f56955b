/*
 * base64.rs
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

//! Streaming base64 encoder with RFC 2045 line folding.
//!
//! Input arrives in chunks of any size; output is emitted incrementally as
//! CRLF-terminated lines of at most the fold width. Used for attachment
//! bodies in rebuilt messages, where whole-buffer encoding would hold the
//! attachment twice in memory.

use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::GatewayError;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Default fold width in output characters, per RFC 2045.
pub const DEFAULT_FOLD: usize = 76;

/// Incremental base64 encoder wrapping a byte sink.
pub struct Base64Encoder<W: Write> {
    inner: W,
    quantum: [u8; 3],
    quantum_len: usize,
    column: usize,
    fold: usize,
    padded: bool,
}

impl<W: Write> Base64Encoder<W> {
    pub fn new(inner: W) -> Self {
        Self::with_fold(inner, DEFAULT_FOLD)
    }

    /// Fold width must be a positive multiple of 4.
    pub fn with_fold(inner: W, fold: usize) -> Self {
        debug_assert!(fold >= 4 && fold % 4 == 0);
        Self {
            inner,
            quantum: [0; 3],
            quantum_len: 0,
            column: 0,
            fold,
            padded: false,
        }
    }

    /// Consume input bytes, emitting complete output lines as they fill.
    pub fn write(&mut self, input: &[u8]) -> std::io::Result<()> {
        for &b in input {
            self.quantum[self.quantum_len] = b;
            self.quantum_len += 1;
            if self.quantum_len == 3 {
                let q = self.quantum;
                self.emit(&[
                    ALPHABET[(q[0] >> 2) as usize],
                    ALPHABET[(((q[0] & 0x03) << 4) | (q[1] >> 4)) as usize],
                    ALPHABET[(((q[1] & 0x0f) << 2) | (q[2] >> 6)) as usize],
                    ALPHABET[(q[2] & 0x3f) as usize],
                ])?;
                self.quantum_len = 0;
            }
        }
        Ok(())
    }

    fn emit(&mut self, chars: &[u8; 4]) -> std::io::Result<()> {
        self.inner.write_all(chars)?;
        self.column += 4;
        if self.column >= self.fold {
            self.inner.write_all(b"\r\n")?;
            self.column = 0;
        }
        Ok(())
    }

    fn pad(&mut self) -> std::io::Result<()> {
        if self.padded {
            return Ok(());
        }
        let q = self.quantum;
        match self.quantum_len {
            1 => self.emit(&[
                ALPHABET[(q[0] >> 2) as usize],
                ALPHABET[((q[0] & 0x03) << 4) as usize],
                b'=',
                b'=',
            ])?,
            2 => self.emit(&[
                ALPHABET[(q[0] >> 2) as usize],
                ALPHABET[(((q[0] & 0x03) << 4) | (q[1] >> 4)) as usize],
                ALPHABET[((q[1] & 0x0f) << 2) as usize],
                b'=',
            ])?,
            _ => {}
        }
        self.quantum_len = 0;
        self.padded = true;
        Ok(())
    }

    /// Pad the final quantum and flush the sink.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.pad()?;
        self.inner.flush()
    }

    /// Pad, terminate the last line with CRLF, and return the sink.
    /// A flush failure on shutdown is swallowed; the write error is not.
    pub fn finish(mut self) -> std::io::Result<W> {
        self.pad()?;
        let _ = self.inner.flush();
        if self.column > 0 {
            self.inner.write_all(b"\r\n")?;
        }
        Ok(self.inner)
    }
}

/// Encode a whole buffer into folded CRLF lines.
pub fn encode_folded(data: &[u8]) -> String {
    let mut enc = Base64Encoder::new(Vec::new());
    // Vec<u8> writes cannot fail.
    let _ = enc.write(data);
    let out = enc.finish().unwrap_or_default();
    String::from_utf8(out).unwrap_or_default()
}

/// Decode, ignoring embedded whitespace and line breaks.
pub fn decode(input: &str) -> Result<Vec<u8>, GatewayError> {
    let filtered: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(filtered.as_bytes())
        .map_err(|e| GatewayError::malformed(format!("invalid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all(data: &[u8], fold: usize) -> String {
        let mut enc = Base64Encoder::with_fold(Vec::new(), fold);
        enc.write(data).unwrap();
        String::from_utf8(enc.finish().unwrap()).unwrap()
    }

    #[test]
    fn round_trip_all_lengths() {
        for len in 0..300 {
            let data: Vec<u8> = (0..len).map(|i| (i * 7 % 251) as u8).collect();
            let encoded = encode_folded(&data);
            assert_eq!(decode(&encoded).unwrap(), data, "length {}", len);
        }
    }

    #[test]
    fn lines_fold_at_width() {
        let data = vec![0xabu8; 200];
        let encoded = encode_all(&data, 76);
        for line in encoded.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= 76);
        }
        // full lines are exactly the fold width
        assert_eq!(encoded.split("\r\n").next().unwrap().len(), 76);
    }

    #[test]
    fn every_line_crlf_terminated() {
        let encoded = encode_folded(&[1u8; 100]);
        assert!(encoded.ends_with("\r\n"));
        assert!(!encoded.contains("\n\n"));
    }

    #[test]
    fn padding_one_and_two_bytes() {
        assert_eq!(encode_folded(b"a"), "YQ==\r\n");
        assert_eq!(encode_folded(b"ab"), "YWI=\r\n");
        assert_eq!(encode_folded(b"abc"), "YWJj\r\n");
    }

    #[test]
    fn empty_input_emits_nothing() {
        assert_eq!(encode_folded(b""), "");
    }

    #[test]
    fn incremental_writes_match_single_write() {
        let data: Vec<u8> = (0..130u8).collect();
        let mut enc = Base64Encoder::new(Vec::new());
        for chunk in data.chunks(7) {
            enc.write(chunk).unwrap();
        }
        let split = String::from_utf8(enc.finish().unwrap()).unwrap();
        assert_eq!(split, encode_folded(&data));
    }

    #[test]
    fn decode_ignores_folding() {
        assert_eq!(decode("YWJj\r\nZGVm\r\n").unwrap(), b"abcdef");
    }
}
