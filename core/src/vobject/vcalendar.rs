/*
 * vcalendar.rs
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

//! Calendar-level policy over [`VObject`]: normalization applied to events
//! before they are stored, and convenience accessors for the session layer.

use crate::error::GatewayError;
use crate::vobject::{VObject, VProperty};

/// Attendee and organizer addresses extracted from an event.
#[derive(Debug, Default, Clone)]
pub struct Participants {
    pub attendees: Vec<String>,
    pub optional_attendees: Vec<String>,
    pub organizer: Option<String>,
}

/// A parsed VCALENDAR with the fix-ups the gateway applies.
#[derive(Debug, Clone)]
pub struct VCalendar {
    pub object: VObject,
}

impl VCalendar {
    pub fn parse(input: &str) -> Result<VCalendar, GatewayError> {
        let object = VObject::parse(input)?;
        if !object.kind.eq_ignore_ascii_case("VCALENDAR") {
            return Err(GatewayError::malformed(format!(
                "expected VCALENDAR, got {}",
                object.kind
            )));
        }
        Ok(VCalendar { object })
    }

    pub fn method(&self) -> Option<&str> {
        self.object.property_value("METHOD")
    }

    pub fn first_vevent(&self) -> Option<&VObject> {
        self.object
            .children
            .iter()
            .find(|c| c.kind.eq_ignore_ascii_case("VEVENT") || c.kind.eq_ignore_ascii_case("VTODO"))
    }

    pub fn is_todo(&self) -> bool {
        self.object
            .children
            .iter()
            .any(|c| c.kind.eq_ignore_ascii_case("VTODO"))
    }

    pub fn event_summary(&self) -> Option<&str> {
        self.first_vevent().and_then(|e| e.property_value("SUMMARY"))
    }

    pub fn event_description(&self) -> Option<&str> {
        self.first_vevent()
            .and_then(|e| e.property_value("DESCRIPTION"))
    }

    pub fn participants(&self) -> Participants {
        let mut result = Participants::default();
        if let Some(event) = self.first_vevent() {
            for attendee in event.properties("ATTENDEE") {
                if let Some(email) = attendee.value().map(strip_mailto) {
                    let optional = attendee
                        .param_value("ROLE")
                        .map(|r| r.eq_ignore_ascii_case("OPT-PARTICIPANT"))
                        .unwrap_or(false);
                    if optional {
                        result.optional_attendees.push(email.to_string());
                    } else {
                        result.attendees.push(email.to_string());
                    }
                }
            }
            result.organizer = event
                .property_value("ORGANIZER")
                .map(|v| strip_mailto(v).to_string());
        }
        result
    }

    /// Normalize a calendar before storage: default METHOD, derive CLASS
    /// from the CalendarServer access level, ensure each event carries an
    /// organizer.
    pub fn fix_vcalendar(&mut self, user_email: &str) {
        if self.object.property("METHOD").is_none() {
            self.object.add_property_value("METHOD", "PUBLISH");
        }
        let access = self
            .object
            .property_value("X-CALENDARSERVER-ACCESS")
            .map(|s| s.to_string());
        for child in &mut self.object.children {
            if !child.kind.eq_ignore_ascii_case("VEVENT")
                && !child.kind.eq_ignore_ascii_case("VTODO")
            {
                continue;
            }
            if let Some(access) = &access {
                child.set_property_value(
                    "CLASS",
                    Some(access_to_class(access).to_string()),
                );
            }
            if child.property("ORGANIZER").is_none() {
                let mut organizer =
                    VProperty::new("ORGANIZER", &format!("mailto:{}", user_email));
                organizer.add_param("CN", user_email);
                child.add_property(organizer);
            }
        }
    }

    pub fn serialize(&self) -> String {
        self.object.serialize()
    }
}

fn strip_mailto(value: &str) -> &str {
    let lower_prefix = "mailto:";
    if value.len() >= lower_prefix.len()
        && value[..lower_prefix.len()].eq_ignore_ascii_case(lower_prefix)
    {
        &value[lower_prefix.len()..]
    } else {
        value
    }
}

/// CalendarServer access level to iCalendar CLASS. The two middle levels are
/// swapped on purpose: Exchange private items map to CONFIDENTIAL access and
/// vice versa.
fn access_to_class(access: &str) -> &str {
    match access.to_ascii_uppercase().as_str() {
        "PRIVATE" => "CONFIDENTIAL",
        "CONFIDENTIAL" | "RESTRICTED" => "PRIVATE",
        _ => access,
    }
}

/// Inverse mapping, used when exporting events.
pub fn class_to_access(class: &str) -> Option<&'static str> {
    match class.to_ascii_uppercase().as_str() {
        "CONFIDENTIAL" => Some("PRIVATE"),
        "PRIVATE" => Some("CONFIDENTIAL"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: &str = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:42\r\nSUMMARY:Review\r\nATTENDEE;CN=\"Doe, John\";ROLE=OPT-PARTICIPANT:mailto:jdoe@example.net\r\nATTENDEE:mailto:asmith@example.net\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

    #[test]
    fn fix_adds_method_and_organizer() {
        let mut cal = VCalendar::parse(EVENT).unwrap();
        cal.fix_vcalendar("owner@example.net");
        assert_eq!(cal.method(), Some("PUBLISH"));
        let event = cal.first_vevent().unwrap();
        assert_eq!(
            event.property_value("ORGANIZER"),
            Some("mailto:owner@example.net")
        );
    }

    #[test]
    fn fix_preserves_existing_method() {
        let input = EVENT.replace("BEGIN:VEVENT", "METHOD:REQUEST\r\nBEGIN:VEVENT");
        let mut cal = VCalendar::parse(&input).unwrap();
        cal.fix_vcalendar("owner@example.net");
        assert_eq!(cal.method(), Some("REQUEST"));
    }

    #[test]
    fn access_level_swaps_class() {
        let input = EVENT.replace(
            "BEGIN:VEVENT",
            "X-CALENDARSERVER-ACCESS:PRIVATE\r\nBEGIN:VEVENT",
        );
        let mut cal = VCalendar::parse(&input).unwrap();
        cal.fix_vcalendar("owner@example.net");
        assert_eq!(
            cal.first_vevent().unwrap().property_value("CLASS"),
            Some("CONFIDENTIAL")
        );
    }

    #[test]
    fn participants_split_by_role() {
        let cal = VCalendar::parse(EVENT).unwrap();
        let p = cal.participants();
        assert_eq!(p.attendees, vec!["asmith@example.net"]);
        assert_eq!(p.optional_attendees, vec!["jdoe@example.net"]);
        assert!(p.organizer.is_none());
    }

    #[test]
    fn non_calendar_root_rejected() {
        assert!(VCalendar::parse("BEGIN:VCARD\r\nEND:VCARD\r\n").is_err());
    }
}
