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

//! Streaming SOAP response parsing.
//!
//! A forward-only walk by local element name; server prefixes are not
//! assumed. Extended property values are keyed by the same canonical form
//! [`crate::ews::locator_response_key`] produces, so the session can read a
//! parsed item back through its field alias.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::codec::base64;
use crate::error::GatewayError;
use crate::ews::{locator_response_key, EwsId};
use crate::field;

/// One item or folder from a response message.
#[derive(Debug, Clone, Default)]
pub struct EwsItem {
    /// Element local name: Message, CalendarItem, Contact, Folder...
    pub kind: String,
    pub id: Option<EwsId>,
    pub fields: Vec<(String, String)>,
    pub mime_content: Option<Vec<u8>>,
}

impl EwsItem {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Field value through the alias table.
    pub fn field_for(&self, alias: &str) -> Option<&str> {
        self.field(&locator_response_key(field::get(alias).ews_locator()))
    }
}

/// A parsed SOAP response body.
#[derive(Debug, Clone, Default)]
pub struct EwsResponse {
    pub response_code: String,
    pub items: Vec<EwsItem>,
}

impl EwsResponse {
    /// Map the EWS response code into the error taxonomy.
    pub fn check(&self, path: &str) -> Result<(), GatewayError> {
        map_response_code(&self.response_code, path)
    }
}

pub fn map_response_code(code: &str, path: &str) -> Result<(), GatewayError> {
    match code {
        "" | "NoError" => Ok(()),
        "ErrorItemNotFound" | "ErrorFolderNotFound" => Err(GatewayError::NotFound {
            path: path.to_string(),
        }),
        "ErrorIrresolvableConflict" => Err(GatewayError::PreconditionFailed {
            path: path.to_string(),
        }),
        "ErrorAccessDenied" | "ErrorImpersonateUserDenied" => Err(GatewayError::AuthFailed(
            format!("{} at {}", code, path),
        )),
        other => Err(GatewayError::http(
            500,
            format!("EWS {} at {}", other, path),
        )),
    }
}

const ITEM_KINDS: [&str; 9] = [
    "Message",
    "CalendarItem",
    "Contact",
    "Task",
    "MeetingRequest",
    "Folder",
    "CalendarFolder",
    "ContactsFolder",
    "TasksFolder",
];

fn xml_err(e: quick_xml::Error) -> GatewayError {
    GatewayError::malformed(format!("invalid SOAP response: {}", e))
}

fn local(e: &BytesStart) -> String {
    let name = e.name();
    let bytes = name.as_ref();
    let pos = bytes.iter().rposition(|&b| b == b':');
    let local = match pos {
        Some(i) => &bytes[i + 1..],
        None => bytes,
    };
    String::from_utf8_lossy(local).into_owned()
}

fn attribute(e: &BytesStart, name: &str) -> Result<Option<String>, GatewayError> {
    match e.try_get_attribute(name) {
        Ok(Some(attr)) => Ok(Some(
            attr.unescape_value()
                .map_err(|err| GatewayError::malformed(err.to_string()))?
                .into_owned(),
        )),
        Ok(None) => Ok(None),
        Err(err) => Err(GatewayError::malformed(err.to_string())),
    }
}

/// Parse a complete SOAP response body.
pub fn parse_response(body: &[u8]) -> Result<EwsResponse, GatewayError> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut response = EwsResponse::default();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local(&e);
                if name == "ResponseCode" {
                    let code = text_content(&mut reader, "ResponseCode")?;
                    // keep the first error; later NoError entries must not mask it
                    if response.response_code.is_empty() || response.response_code == "NoError" {
                        response.response_code = code;
                    }
                } else if ITEM_KINDS.contains(&name.as_str()) {
                    response.items.push(parse_item(&mut reader, &name)?);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_err(e)),
        }
        buf.clear();
    }
    Ok(response)
}

fn parse_item(reader: &mut Reader<&[u8]>, kind: &str) -> Result<EwsItem, GatewayError> {
    let mut item = EwsItem {
        kind: kind.to_string(),
        ..EwsItem::default()
    };
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if is_id_element(&e) => {
                let id = attribute(&e, "Id")?
                    .ok_or_else(|| GatewayError::malformed("id element without Id attribute"))?;
                item.id = Some(match attribute(&e, "ChangeKey")? {
                    Some(ck) => EwsId::with_change_key(id, ck),
                    None => EwsId::new(id),
                });
            }
            Ok(Event::Start(e)) => {
                let name = local(&e);
                match name.as_str() {
                    "MimeContent" => {
                        let encoded = text_content(reader, "MimeContent")?;
                        item.mime_content = Some(base64::decode(&encoded)?);
                    }
                    "ExtendedProperty" => parse_extended_property(reader, &mut item)?,
                    _ => {
                        let value = text_content(reader, &name)?;
                        if !value.is_empty() {
                            item.fields.push((name, value));
                        }
                    }
                }
            }
            Ok(Event::End(e)) if local_end(&e) == kind => return Ok(item),
            Ok(Event::Eof) => return Err(GatewayError::malformed("truncated item element")),
            Ok(_) => {}
            Err(e) => return Err(xml_err(e)),
        }
        buf.clear();
    }
}

fn is_id_element(e: &BytesStart) -> bool {
    let name = local(e);
    name == "ItemId" || name == "FolderId"
}

fn parse_extended_property(
    reader: &mut Reader<&[u8]>,
    item: &mut EwsItem,
) -> Result<(), GatewayError> {
    let mut buf = Vec::new();
    let mut key: Option<String> = None;
    let mut value = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if local(&e) == "ExtendedFieldURI" => {
                key = Some(extended_field_key(&e)?);
            }
            Ok(Event::Start(e)) if local(&e) == "Value" => {
                value = text_content(reader, "Value")?;
            }
            Ok(Event::End(e)) if local_end(&e) == "ExtendedProperty" => {
                if let Some(key) = key {
                    item.fields.push((key, value));
                }
                return Ok(());
            }
            Ok(Event::Eof) => {
                return Err(GatewayError::malformed("truncated ExtendedProperty"))
            }
            Ok(_) => {}
            Err(e) => return Err(xml_err(e)),
        }
        buf.clear();
    }
}

/// Canonical key from the attributes the server echoes back; the tag form
/// is normalized since the server drops leading zeros.
fn extended_field_key(e: &BytesStart) -> Result<String, GatewayError> {
    if let Some(tag) = attribute(e, "PropertyTag")? {
        let raw = tag.trim_start_matches("0x");
        let tag = u32::from_str_radix(raw, 16)
            .map_err(|_| GatewayError::malformed(format!("invalid property tag: {}", raw)))?;
        return Ok(format!("tag:0x{:x}", tag));
    }
    if let Some(set) = attribute(e, "DistinguishedPropertySetId")? {
        if let Some(id) = attribute(e, "PropertyId")? {
            return Ok(format!("id:{}:{}", set, id));
        }
        if let Some(name) = attribute(e, "PropertyName")? {
            return Ok(format!("name:{}:{}", set, name));
        }
    }
    Err(GatewayError::malformed("unrecognized ExtendedFieldURI"))
}

fn local_end(e: &quick_xml::events::BytesEnd) -> String {
    let name = e.name();
    let bytes = name.as_ref();
    let pos = bytes.iter().rposition(|&b| b == b':');
    let local = match pos {
        Some(i) => &bytes[i + 1..],
        None => bytes,
    };
    String::from_utf8_lossy(local).into_owned()
}

fn text_content(reader: &mut Reader<&[u8]>, name: &str) -> Result<String, GatewayError> {
    let mut buf = Vec::new();
    let mut value = String::new();
    let mut depth = 0u32;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(t)) => {
                value = t
                    .unescape()
                    .map_err(|e| GatewayError::malformed(e.to_string()))?
                    .into_owned();
            }
            Ok(Event::Start(e)) if local(&e) == name => depth += 1,
            Ok(Event::End(e)) if local_end(&e) == name => {
                if depth == 0 {
                    return Ok(value);
                }
                depth -= 1;
            }
            Ok(Event::Eof) => {
                return Err(GatewayError::malformed(format!(
                    "end element for {} not found",
                    name
                )))
            }
            Ok(_) => {}
            Err(e) => return Err(xml_err(e)),
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIND_ITEM: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
<s:Body><m:FindItemResponse xmlns:m="urn:m" xmlns:t="urn:t">
<m:ResponseMessages><m:FindItemResponseMessage ResponseClass="Success">
<m:ResponseCode>NoError</m:ResponseCode>
<m:RootFolder><t:Items>
<t:Message>
  <t:ItemId Id="AAMkADEx" ChangeKey="CQAAABYA"/>
  <t:Subject>Hello</t:Subject>
  <t:ExtendedProperty>
    <t:ExtendedFieldURI PropertyTag="0xe23" PropertyType="Integer"/>
    <t:Value>1204</t:Value>
  </t:ExtendedProperty>
</t:Message>
</t:Items></m:RootFolder>
</m:FindItemResponseMessage></m:ResponseMessages>
</m:FindItemResponse></s:Body></s:Envelope>"#;

    #[test]
    fn item_id_and_fields_parsed() {
        let r = parse_response(FIND_ITEM.as_bytes()).unwrap();
        assert_eq!(r.response_code, "NoError");
        assert_eq!(r.items.len(), 1);
        let item = &r.items[0];
        assert_eq!(item.kind, "Message");
        let id = item.id.as_ref().unwrap();
        assert_eq!(id.id, "AAMkADEx");
        assert_eq!(id.change_key.as_deref(), Some("CQAAABYA"));
        assert_eq!(item.field("Subject"), Some("Hello"));
        assert_eq!(item.field("tag:0xe23"), Some("1204"));
    }

    #[test]
    fn field_lookup_through_alias() {
        let r = parse_response(FIND_ITEM.as_bytes()).unwrap();
        assert_eq!(r.items[0].field_for("imapUid"), Some("1204"));
    }

    #[test]
    fn error_code_maps_to_taxonomy() {
        let body = FIND_ITEM.replace("NoError", "ErrorItemNotFound");
        let r = parse_response(body.as_bytes()).unwrap();
        assert!(r.check("/path").unwrap_err().is_not_found());

        let body = FIND_ITEM.replace("NoError", "ErrorIrresolvableConflict");
        let r = parse_response(body.as_bytes()).unwrap();
        assert!(r.check("/path").unwrap_err().is_conflict());
    }

    #[test]
    fn mime_content_decoded() {
        let body = r#"<r><m:ResponseCode xmlns:m="u">NoError</m:ResponseCode>
            <t:Message xmlns:t="u"><t:ItemId Id="A"/>
            <t:MimeContent CharacterSet="UTF-8">U3ViamVjdDogeA==</t:MimeContent>
            </t:Message></r>"#;
        let r = parse_response(body.as_bytes()).unwrap();
        assert_eq!(
            r.items[0].mime_content.as_deref(),
            Some(b"Subject: x".as_ref())
        );
    }

    #[test]
    fn truncated_response_is_malformed() {
        let body = b"<r><t:Message xmlns:t=\"u\"><t:Subject>x";
        assert!(parse_response(body).is_err());
    }
}
