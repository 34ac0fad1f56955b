/*
 * property.rs
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

//! Property line parsing for vCard and iCalendar content.
//!
//! Grammar: `KEY[;PARAM[=VALUE[,VALUE...]]...]:VALUE[;VALUE...]` with
//! double-quoted parameter values and backslash escapes in values.

use crate::error::GatewayError;

/// Keys whose value is a comma-separated list in vCard practice. Several
/// clients emit bare commas here; the comma is mapped to an embedded newline
/// on parse so the pieces survive (kept for interop, diverges from a strict
/// RFC 6350 reading).
const COMMA_LIST_KEYS: [&str; 4] = ["N", "ADR", "CATEGORIES", "NICKNAME"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VParam {
    pub name: String,
    pub values: Vec<String>,
}

/// One logical content line, split into key, parameters and values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VProperty {
    pub key: String,
    pub params: Vec<VParam>,
    pub values: Vec<String>,
}

enum State {
    Key,
    ParamName,
    ParamValue,
    QuotedParamValue,
    Value,
    ValueBackslash,
}

impl VProperty {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            params: Vec::new(),
            values: vec![value.to_string()],
        }
    }

    /// Parse one unfolded line.
    pub fn parse(line: &str) -> Result<VProperty, GatewayError> {
        let mut state = State::Key;
        let mut key = String::new();
        let mut params: Vec<VParam> = Vec::new();
        let mut param_name = String::new();
        let mut param_values: Vec<String> = Vec::new();
        let mut buffer = String::new();
        let mut values: Vec<String> = Vec::new();
        let comma_is_newline = |key: &str| COMMA_LIST_KEYS.contains(&key);

        for c in line.chars() {
            match state {
                State::Key => match c {
                    ';' => {
                        key = std::mem::take(&mut buffer);
                        state = State::ParamName;
                    }
                    ':' => {
                        key = std::mem::take(&mut buffer);
                        state = State::Value;
                    }
                    // group prefix (item1.TEL) is dropped
                    '.' => buffer.clear(),
                    _ => buffer.push(c.to_ascii_uppercase()),
                },
                State::ParamName => match c {
                    '=' => {
                        param_name = std::mem::take(&mut buffer);
                        state = State::ParamValue;
                    }
                    ';' => {
                        params.push(VParam {
                            name: std::mem::take(&mut buffer),
                            values: Vec::new(),
                        });
                    }
                    ':' => {
                        params.push(VParam {
                            name: std::mem::take(&mut buffer),
                            values: Vec::new(),
                        });
                        state = State::Value;
                    }
                    _ => buffer.push(c.to_ascii_uppercase()),
                },
                State::ParamValue => match c {
                    '"' if buffer.is_empty() => state = State::QuotedParamValue,
                    ',' => param_values.push(std::mem::take(&mut buffer)),
                    ';' => {
                        param_values.push(std::mem::take(&mut buffer));
                        params.push(VParam {
                            name: std::mem::take(&mut param_name),
                            values: std::mem::take(&mut param_values),
                        });
                        state = State::ParamName;
                    }
                    ':' => {
                        param_values.push(std::mem::take(&mut buffer));
                        params.push(VParam {
                            name: std::mem::take(&mut param_name),
                            values: std::mem::take(&mut param_values),
                        });
                        state = State::Value;
                    }
                    _ => buffer.push(c),
                },
                State::QuotedParamValue => match c {
                    '"' => state = State::ParamValue,
                    _ => buffer.push(c),
                },
                State::Value => match c {
                    '\\' => state = State::ValueBackslash,
                    ';' => values.push(std::mem::take(&mut buffer)),
                    ',' if comma_is_newline(&key) => buffer.push('\n'),
                    _ => buffer.push(c),
                },
                State::ValueBackslash => {
                    match c {
                        'n' | 'N' => buffer.push('\n'),
                        'r' => buffer.push('\r'),
                        other => buffer.push(other),
                    }
                    state = State::Value;
                }
            }
        }

        match state {
            State::Value | State::ValueBackslash => {
                values.push(buffer);
                Ok(VProperty { key, params, values })
            }
            _ => Err(GatewayError::malformed(format!(
                "content line without value: {}",
                line
            ))),
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.values.first().map(|s| s.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&VParam> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.param(name)
            .and_then(|p| p.values.first())
            .map(|s| s.as_str())
    }

    pub fn add_param(&mut self, name: &str, value: &str) {
        self.params.push(VParam {
            name: name.to_string(),
            values: vec![value.to_string()],
        });
    }

    /// Serialize to a logical line (unfolded).
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(&self.key);
        for param in &self.params {
            out.push(';');
            out.push_str(&param.name);
            if !param.values.is_empty() {
                out.push('=');
                for (i, v) in param.values.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if param.name == "CN" || needs_quoting(v) {
                        out.push('"');
                        out.push_str(v);
                        out.push('"');
                    } else {
                        out.push_str(v);
                    }
                }
            }
        }
        out.push(':');
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            escape_value(v, &mut out);
        }
        out
    }
}

fn needs_quoting(value: &str) -> bool {
    value
        .chars()
        .any(|c| matches!(c, ';' | ',' | ':' | '(' | ')' | '/' | ' '))
}

fn escape_value(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_key_value() {
        let p = VProperty::parse("SUMMARY:Team meeting").unwrap();
        assert_eq!(p.key, "SUMMARY");
        assert_eq!(p.value(), Some("Team meeting"));
        assert!(p.params.is_empty());
    }

    #[test]
    fn quoted_param_keeps_separators() {
        let p = VProperty::parse("ATTENDEE;CN=\"Doe, John\":mailto:jdoe@example.net").unwrap();
        assert_eq!(p.key, "ATTENDEE");
        assert_eq!(p.param_value("CN"), Some("Doe, John"));
        assert_eq!(p.value(), Some("mailto:jdoe@example.net"));
    }

    #[test]
    fn cn_param_requoted_on_output() {
        let p = VProperty::parse("ATTENDEE;CN=\"Doe, John\":mailto:jdoe@example.net").unwrap();
        assert_eq!(
            p.serialize(),
            "ATTENDEE;CN=\"Doe, John\":mailto:jdoe@example.net"
        );
    }

    #[test]
    fn escaped_newline_decoded() {
        let p = VProperty::parse("DESCRIPTION:line one\\nline two").unwrap();
        assert_eq!(p.value(), Some("line one\nline two"));
        assert_eq!(p.serialize(), "DESCRIPTION:line one\\nline two");
    }

    #[test]
    fn structured_values_split_on_semicolon() {
        let p = VProperty::parse("ADR;TYPE=HOME:;;12 Main St;Springfield;;12345;US").unwrap();
        assert_eq!(p.values.len(), 7);
        assert_eq!(p.values[2], "12 Main St");
    }

    #[test]
    fn bare_comma_in_name_becomes_newline() {
        let p = VProperty::parse("N:Doe,John").unwrap();
        assert_eq!(p.value(), Some("Doe\nJohn"));
    }

    #[test]
    fn group_prefix_stripped() {
        let p = VProperty::parse("item1.TEL;TYPE=CELL:+1 555 0100").unwrap();
        assert_eq!(p.key, "TEL");
    }

    #[test]
    fn param_without_value() {
        let p = VProperty::parse("PHOTO;BASE64:abcd").unwrap();
        assert!(p.param("BASE64").is_some());
        assert_eq!(p.value(), Some("abcd"));
    }

    #[test]
    fn missing_colon_is_error() {
        assert!(VProperty::parse("BROKENLINE").is_err());
        assert!(VProperty::parse("KEY;PARAM=x").is_err());
    }

    #[test]
    fn multiple_param_values() {
        let p = VProperty::parse("TEL;TYPE=HOME,VOICE:+1 555 0100").unwrap();
        assert_eq!(p.param("TYPE").unwrap().values, vec!["HOME", "VOICE"]);
    }
}
