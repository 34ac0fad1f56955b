/*
 * values.rs
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

//! Value coercion between wire representations.
//!
//! Booleans are "1"/"0" on WebDAV and "true"/"false" on EWS, never mixed.
//! Timestamps convert between the Exchange zulu format, RFC 2822 headers
//! and iCalendar basic format through fixed chrono format strings.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::GatewayError;

const EXCHANGE_ZULU_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
const EXCHANGE_ZULU: &str = "%Y-%m-%dT%H:%M:%SZ";
const ICS_BASIC: &str = "%Y%m%dT%H%M%SZ";
const SEARCH_DATE: &str = "%Y/%m/%d %H:%M:%S";

/// WebDAV boolean representation.
pub fn dav_bool(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

pub fn parse_dav_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// EWS boolean representation.
pub fn ews_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Parse an Exchange zulu timestamp, with or without milliseconds.
pub fn parse_exchange_zulu(value: &str) -> Result<DateTime<Utc>, GatewayError> {
    NaiveDateTime::parse_from_str(value, EXCHANGE_ZULU_MILLIS)
        .or_else(|_| NaiveDateTime::parse_from_str(value, EXCHANGE_ZULU))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| GatewayError::malformed(format!("invalid timestamp {}: {}", value, e)))
}

pub fn format_exchange_zulu(date: DateTime<Utc>) -> String {
    date.format(EXCHANGE_ZULU_MILLIS).to_string()
}

/// SEARCH request literal format, local-free wall clock in UTC.
pub fn format_search_date(date: DateTime<Utc>) -> String {
    date.format(SEARCH_DATE).to_string()
}

pub fn parse_ics_date(value: &str) -> Result<DateTime<Utc>, GatewayError> {
    NaiveDateTime::parse_from_str(value, ICS_BASIC)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| GatewayError::malformed(format!("invalid ICS date {}: {}", value, e)))
}

pub fn format_ics_date(date: DateTime<Utc>) -> String {
    date.format(ICS_BASIC).to_string()
}

pub fn parse_rfc2822(value: &str) -> Result<DateTime<Utc>, GatewayError> {
    DateTime::parse_from_rfc2822(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| GatewayError::malformed(format!("invalid RFC 2822 date {}: {}", value, e)))
}

pub fn format_rfc2822(date: DateTime<Utc>) -> String {
    date.to_rfc2822()
}

/// Three-point importance scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    High,
    Normal,
    Low,
}

impl Importance {
    /// Wire value; 1 is high, 5 normal, 9 low.
    pub fn priority(self) -> i64 {
        match self {
            Importance::High => 1,
            Importance::Normal => 5,
            Importance::Low => 9,
        }
    }

    /// Values outside the three buckets are absent, not clamped.
    pub fn from_priority(value: i64) -> Option<Importance> {
        match value {
            1 => Some(Importance::High),
            5 => Some(Importance::Normal),
            9 => Some(Importance::Low),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2011, 3, 4)
                .unwrap()
                .and_hms_opt(15, 30, 0)
                .unwrap(),
        )
    }

    #[test]
    fn zulu_with_and_without_millis() {
        let with = parse_exchange_zulu("2011-03-04T15:30:00.000Z").unwrap();
        let without = parse_exchange_zulu("2011-03-04T15:30:00Z").unwrap();
        assert_eq!(with, sample());
        assert_eq!(without, sample());
    }

    #[test]
    fn zulu_format_includes_millis() {
        assert_eq!(format_exchange_zulu(sample()), "2011-03-04T15:30:00.000Z");
    }

    #[test]
    fn ics_round_trip() {
        let d = parse_ics_date("20110304T153000Z").unwrap();
        assert_eq!(format_ics_date(d), "20110304T153000Z");
        assert_eq!(d, sample());
    }

    #[test]
    fn search_date_format() {
        assert_eq!(format_search_date(sample()), "2011/03/04 15:30:00");
    }

    #[test]
    fn exchange_to_rfc2822() {
        let d = parse_exchange_zulu("2011-03-04T15:30:00Z").unwrap();
        assert_eq!(format_rfc2822(d), "Fri, 4 Mar 2011 15:30:00 +0000");
    }

    #[test]
    fn booleans_never_mixed() {
        assert_eq!(dav_bool(true), "1");
        assert_eq!(ews_bool(true), "true");
        assert!(parse_dav_bool("1"));
        assert!(!parse_dav_bool("0"));
    }

    #[test]
    fn importance_out_of_range_is_absent() {
        assert_eq!(Importance::from_priority(1), Some(Importance::High));
        assert_eq!(Importance::from_priority(3), None);
        assert_eq!(Importance::from_priority(9), Some(Importance::Low));
    }
}
