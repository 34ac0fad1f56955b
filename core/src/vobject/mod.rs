/*
 * mod.rs
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

//! Structured text objects: the BEGIN/END block model shared by vCard and
//! iCalendar.

pub mod property;
pub mod vcalendar;

pub use property::{VParam, VProperty};

use crate::codec::folding::{unfold_lines, FoldingWriter};
use crate::error::GatewayError;

/// A BEGIN/END block: type tag, ordered properties, ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VObject {
    pub kind: String,
    pub properties: Vec<VProperty>,
    pub children: Vec<VObject>,
}

impl VObject {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse a complete folded text block.
    pub fn parse(input: &str) -> Result<VObject, GatewayError> {
        let lines = unfold_lines(input);
        let mut iter = lines.iter().map(|s| s.as_str());
        let first = iter
            .next()
            .ok_or_else(|| GatewayError::malformed("empty object"))?;
        let kind = begin_kind(first)
            .ok_or_else(|| GatewayError::malformed(format!("expected BEGIN, got {}", first)))?;
        Self::parse_body(kind, &mut iter)
    }

    fn parse_body<'a>(
        kind: &str,
        lines: &mut impl Iterator<Item = &'a str>,
    ) -> Result<VObject, GatewayError> {
        let mut object = VObject::new(kind);
        let opener = format!("BEGIN:{}", kind);
        let closer = format!("END:{}", kind);
        let mut first_line = true;
        loop {
            let line = lines
                .next()
                .ok_or_else(|| GatewayError::malformed("unexpected end of stream"))?;
            if line.eq_ignore_ascii_case(&closer) {
                return Ok(object);
            }
            // some servers repeat the opening line; skip the duplicate
            if first_line && line.eq_ignore_ascii_case(&opener) {
                first_line = false;
                continue;
            }
            first_line = false;
            if let Some(child_kind) = begin_kind(line) {
                object.children.push(Self::parse_body(child_kind, lines)?);
            } else {
                object.properties.push(VProperty::parse(line)?);
            }
        }
    }

    pub fn property(&self, key: &str) -> Option<&VProperty> {
        self.properties
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
    }

    pub fn properties<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a VProperty> {
        self.properties
            .iter()
            .filter(move |p| p.key.eq_ignore_ascii_case(key))
    }

    pub fn property_value(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(|p| p.value())
    }

    /// Replace the first property with this key, or append. `None` removes
    /// all occurrences.
    pub fn set_property_value(&mut self, key: &str, value: Option<String>) {
        match value {
            Some(v) => {
                if let Some(p) = self
                    .properties
                    .iter_mut()
                    .find(|p| p.key.eq_ignore_ascii_case(key))
                {
                    p.values = vec![v];
                } else {
                    self.properties.push(VProperty::new(key, &v));
                }
            }
            None => self
                .properties
                .retain(|p| !p.key.eq_ignore_ascii_case(key)),
        }
    }

    pub fn add_property_value(&mut self, key: &str, value: &str) {
        self.properties.push(VProperty::new(key, value));
    }

    pub fn add_property(&mut self, property: VProperty) {
        self.properties.push(property);
    }

    pub fn children_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a VObject> {
        self.children
            .iter()
            .filter(move |c| c.kind.eq_ignore_ascii_case(kind))
    }

    fn write(&self, writer: &mut FoldingWriter) {
        writer.write_line(&format!("BEGIN:{}", self.kind));
        for property in &self.properties {
            writer.write_line(&property.serialize());
        }
        for child in &self.children {
            child.write(writer);
        }
        writer.write_line(&format!("END:{}", self.kind));
    }

    /// Serialize with folding at 75 octets and CRLF line breaks.
    pub fn serialize(&self) -> String {
        let mut writer = FoldingWriter::new();
        self.write(&mut writer);
        writer.into_string()
    }
}

fn begin_kind(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("BEGIN:")
        .or_else(|| line.strip_prefix("begin:"))?;
    Some(rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:1234\r\nSUMMARY:Standup\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

    #[test]
    fn nested_blocks_parse() {
        let cal = VObject::parse(SAMPLE).unwrap();
        assert_eq!(cal.kind, "VCALENDAR");
        assert_eq!(cal.property_value("VERSION"), Some("2.0"));
        assert_eq!(cal.children.len(), 1);
        assert_eq!(cal.children[0].property_value("UID"), Some("1234"));
    }

    #[test]
    fn missing_end_is_error() {
        let err = VObject::parse("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n").unwrap_err();
        assert!(err.to_string().contains("unexpected end of stream"));
    }

    #[test]
    fn duplicate_begin_line_skipped() {
        let input = "BEGIN:VCARD\r\nBEGIN:VCARD\r\nFN:A\r\nEND:VCARD\r\n";
        let card = VObject::parse(input).unwrap();
        assert_eq!(card.property_value("FN"), Some("A"));
    }

    #[test]
    fn semantic_round_trip() {
        let long_desc: String = std::iter::repeat("word ").take(40).collect();
        let input = format!(
            "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nDESCRIPTION:{}\\nsecond line\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
            long_desc
        );
        let once = VObject::parse(&input).unwrap();
        let twice = VObject::parse(&once.serialize()).unwrap();
        assert_eq!(once, twice);
        // the folded output stays within 75 octets per physical line
        for line in once.serialize().split("\r\n") {
            assert!(line.len() <= 75);
        }
    }

    #[test]
    fn set_property_value_replaces_and_removes() {
        let mut event = VObject::new("VEVENT");
        event.set_property_value("SUMMARY", Some("a".to_string()));
        event.set_property_value("SUMMARY", Some("b".to_string()));
        assert_eq!(event.properties.len(), 1);
        assert_eq!(event.property_value("SUMMARY"), Some("b"));
        event.set_property_value("SUMMARY", None);
        assert!(event.property("SUMMARY").is_none());
    }
}
