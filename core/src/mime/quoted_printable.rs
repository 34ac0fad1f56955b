/*
 * quoted_printable.rs
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

//! Quoted-Printable encoder for Content-Transfer-Encoding (RFC 2045).

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Longest encoded line before a soft break, escape sequence included.
const LINE_LIMIT: usize = 75;

/// Encode `src` as quoted-printable with CRLF soft line breaks.
///
/// CRLF in the input passes through as a hard break. A space or tab that
/// would land at the end of a line is escaped so transports cannot strip
/// it.
pub fn encode(src: &[u8]) -> String {
    let mut out = String::with_capacity(src.len() + src.len() / 8);
    let mut column = 0usize;
    let mut i = 0usize;
    while i < src.len() {
        let b = src[i];
        if b == b'\r' && i + 1 < src.len() && src[i + 1] == b'\n' {
            out.push_str("\r\n");
            column = 0;
            i += 2;
            continue;
        }
        let at_line_end = match src.get(i + 1) {
            None => true,
            Some(b'\r') if src.get(i + 2) == Some(&b'\n') => true,
            _ => false,
        };
        let literal = matches!(b, b'\t' | b' ' | 0x21..=0x7e if b != b'=')
            && !((b == b' ' || b == b'\t') && at_line_end);
        let width = if literal { 1 } else { 3 };
        if column + width > LINE_LIMIT {
            out.push_str("=\r\n");
            column = 0;
        }
        if literal {
            out.push(b as char);
        } else {
            out.push('=');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
        column += width;
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_unchanged() {
        assert_eq!(encode(b"hello world"), "hello world");
    }

    #[test]
    fn equals_sign_escaped() {
        assert_eq!(encode(b"a=b"), "a=3Db");
    }

    #[test]
    fn non_ascii_escaped_uppercase_hex() {
        assert_eq!(encode("é".as_bytes()), "=C3=A9");
    }

    #[test]
    fn crlf_passes_through() {
        assert_eq!(encode(b"line1\r\nline2"), "line1\r\nline2");
    }

    #[test]
    fn trailing_space_escaped() {
        assert_eq!(encode(b"end \r\nnext"), "end=20\r\nnext");
        assert_eq!(encode(b"tail "), "tail=20");
    }

    #[test]
    fn long_lines_soft_broken() {
        let input = vec![b'a'; 200];
        let encoded = encode(&input);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76);
        }
        let decoded: String = encoded.replace("=\r\n", "");
        assert_eq!(decoded.len(), 200);
    }
}
