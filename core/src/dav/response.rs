/*
 * response.rs
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

//! Streaming multistatus parsing.
//!
//! A forward-only event walk over the (repaired) response body. Only
//! propstat blocks whose status is exactly `HTTP/1.1 200 OK` contribute
//! properties; everything else is skipped without building a tree.

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::dav::repair::repair_tag_names;
use crate::error::GatewayError;

const PROPSTAT_OK: &str = "HTTP/1.1 200 OK";

#[derive(Debug, Clone)]
pub struct DavProperty {
    pub name: String,
    pub namespace: String,
    pub value: String,
}

/// Properties returned for one `<response>` element.
#[derive(Debug, Clone, Default)]
pub struct MultiStatusResponse {
    pub href: String,
    pub status: String,
    pub properties: Vec<DavProperty>,
}

impl MultiStatusResponse {
    /// Property value by local name, case-insensitive.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value.as_str())
    }
}

type XmlReader<'a> = NsReader<&'a [u8]>;

fn xml_err(e: quick_xml::Error) -> GatewayError {
    GatewayError::malformed(format!("invalid multistatus: {}", e))
}

/// Parse a multistatus body, applying the tag-name repair first.
pub fn parse_multistatus(body: &[u8]) -> Result<Vec<MultiStatusResponse>, GatewayError> {
    let repaired = repair_tag_names(body);
    let mut reader = NsReader::from_reader(repaired.as_slice());
    let mut buf = Vec::new();
    let mut responses = Vec::new();
    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((_, Event::Start(e))) if e.local_name().as_ref() == b"response" => {
                responses.push(parse_response(&mut reader)?);
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_err(e)),
        }
        buf.clear();
    }
    Ok(responses)
}

fn parse_response(reader: &mut XmlReader) -> Result<MultiStatusResponse, GatewayError> {
    let mut response = MultiStatusResponse::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((_, Event::Start(e))) => match e.local_name().as_ref() {
                b"href" => response.href = element_text(reader, b"href")?,
                b"status" => response.status = element_text(reader, b"status")?,
                b"propstat" => parse_propstat(reader, &mut response)?,
                _ => {}
            },
            Ok((_, Event::End(e))) if e.local_name().as_ref() == b"response" => {
                return Ok(response)
            }
            Ok((_, Event::Eof)) => {
                return Err(GatewayError::malformed("truncated multistatus response"))
            }
            Ok(_) => {}
            Err(e) => return Err(xml_err(e)),
        }
        buf.clear();
    }
}

fn parse_propstat(
    reader: &mut XmlReader,
    response: &mut MultiStatusResponse,
) -> Result<(), GatewayError> {
    let mut buf = Vec::new();
    let mut ok = false;
    // servers order prop and status both ways; collect first, decide last
    let mut pending = MultiStatusResponse::default();
    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((_, Event::Start(e))) => match e.local_name().as_ref() {
                b"status" => ok = element_text(reader, b"status")? == PROPSTAT_OK,
                b"prop" => parse_prop(reader, &mut pending)?,
                _ => {}
            },
            Ok((_, Event::End(e))) if e.local_name().as_ref() == b"propstat" => {
                if ok {
                    response.properties.append(&mut pending.properties);
                }
                return Ok(());
            }
            Ok((_, Event::Eof)) => {
                return Err(GatewayError::malformed("truncated propstat block"))
            }
            Ok(_) => {}
            Err(e) => return Err(xml_err(e)),
        }
        buf.clear();
    }
}

fn parse_prop(
    reader: &mut XmlReader,
    response: &mut MultiStatusResponse,
) -> Result<(), GatewayError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((resolve, Event::Start(e))) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let namespace = match resolve {
                    ResolveResult::Bound(ns) => {
                        String::from_utf8_lossy(ns.into_inner()).into_owned()
                    }
                    _ => String::new(),
                };
                let value = tag_content(reader, name.as_bytes())?;
                if let Some(value) = value {
                    response.properties.push(DavProperty {
                        name,
                        namespace,
                        value,
                    });
                }
            }
            Ok((_, Event::End(e))) if e.local_name().as_ref() == b"prop" => return Ok(()),
            Ok((_, Event::Eof)) => return Err(GatewayError::malformed("truncated prop block")),
            Ok(_) => {}
            Err(e) => return Err(xml_err(e)),
        }
        buf.clear();
    }
}

/// Text content of the current element, scanning to its end tag and
/// tolerating nested children (their text wins last, matching a forward
/// walk). `None` when the element carries no character data.
fn tag_content(reader: &mut XmlReader, name: &[u8]) -> Result<Option<String>, GatewayError> {
    let mut buf = Vec::new();
    let mut value: Option<String> = None;
    let mut depth = 0u32;
    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((_, Event::Text(t))) => {
                value = Some(
                    t.unescape()
                        .map_err(|e| GatewayError::malformed(e.to_string()))?
                        .into_owned(),
                );
            }
            Ok((_, Event::Start(e))) if e.local_name().as_ref() == name => depth += 1,
            Ok((_, Event::End(e))) if e.local_name().as_ref() == name => {
                if depth == 0 {
                    return Ok(value);
                }
                depth -= 1;
            }
            Ok((_, Event::Eof)) => {
                return Err(GatewayError::malformed(format!(
                    "end element for {} not found",
                    String::from_utf8_lossy(name)
                )))
            }
            Ok(_) => {}
            Err(e) => return Err(xml_err(e)),
        }
        buf.clear();
    }
}

fn element_text(reader: &mut XmlReader, name: &[u8]) -> Result<String, GatewayError> {
    Ok(tag_content(reader, name)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:e="urn:schemas:httpmail:">
  <D:response>
    <D:href>/exchange/user/Inbox/item.EML</D:href>
    <D:status>HTTP/1.1 200 OK</D:status>
    <D:propstat>
      <D:status>HTTP/1.1 200 OK</D:status>
      <D:prop>
        <e:subject>Hello</e:subject>
        <D:getetag>"abc123"</D:getetag>
      </D:prop>
    </D:propstat>
    <D:propstat>
      <D:status>HTTP/1.1 404 Not Found</D:status>
      <D:prop><e:missing/></D:prop>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    #[test]
    fn prop_before_status_accepted() {
        let body = r#"<D:multistatus xmlns:D="DAV:">
          <D:response><D:href>/x</D:href><D:propstat>
            <D:prop><D:displayname>Inbox</D:displayname></D:prop>
            <D:status>HTTP/1.1 200 OK</D:status>
          </D:propstat></D:response></D:multistatus>"#;
        let responses = parse_multistatus(body.as_bytes()).unwrap();
        assert_eq!(responses[0].property("displayname"), Some("Inbox"));
    }

    #[test]
    fn properties_from_ok_propstat_only() {
        let responses = parse_multistatus(SAMPLE.as_bytes()).unwrap();
        assert_eq!(responses.len(), 1);
        let r = &responses[0];
        assert_eq!(r.href, "/exchange/user/Inbox/item.EML");
        assert_eq!(r.property("subject"), Some("Hello"));
        assert_eq!(r.property("getetag"), Some("\"abc123\""));
        assert!(r.property("missing").is_none());
    }

    #[test]
    fn namespace_recorded_per_property() {
        let responses = parse_multistatus(SAMPLE.as_bytes()).unwrap();
        let p = responses[0]
            .properties
            .iter()
            .find(|p| p.name == "subject")
            .unwrap();
        assert_eq!(p.namespace, "urn:schemas:httpmail:");
    }

    #[test]
    fn repaired_digit_tags_parse() {
        let body = br#"<D:multistatus xmlns:D="DAV:"><D:response>
            <D:href>/x</D:href><D:propstat><D:status>HTTP/1.1 200 OK</D:status>
            <D:prop><0x8506 xmlns="ns">1</0x8506></D:prop></D:propstat>
            </D:response></D:multistatus>"#;
        let responses = parse_multistatus(body).unwrap();
        assert_eq!(responses[0].property("ax8506"), Some("1"));
    }

    #[test]
    fn truncated_body_is_malformed() {
        let body = b"<D:multistatus xmlns:D=\"DAV:\"><D:response><D:href>/x</D:href>";
        assert!(parse_multistatus(body).is_err());
    }

    #[test]
    fn multiple_responses() {
        let body = br#"<m xmlns:D="DAV:">
          <D:response><D:href>/a</D:href><D:status>HTTP/1.1 200 OK</D:status></D:response>
          <D:response><D:href>/b</D:href><D:status>HTTP/1.1 200 OK</D:status></D:response>
        </m>"#;
        let responses = parse_multistatus(body).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1].href, "/b");
    }
}
