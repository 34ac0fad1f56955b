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

//! EWS SOAP codec: request envelopes and streaming response parsing.

pub mod requests;
pub mod response;

pub use requests::*;
pub use response::{parse_response, EwsItem, EwsResponse};

use crate::field::EwsLocator;

pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const MESSAGES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
pub const TYPES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/types";

/// Item or folder id with optional change key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EwsId {
    pub id: String,
    pub change_key: Option<String>,
}

impl EwsId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            change_key: None,
        }
    }

    pub fn with_change_key(id: impl Into<String>, change_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            change_key: Some(change_key.into()),
        }
    }
}

/// Server-designated well-known folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinguishedFolder {
    Inbox,
    DeletedItems,
    SentItems,
    Drafts,
    Calendar,
    Contacts,
    Outbox,
    MsgFolderRoot,
    PublicFoldersRoot,
}

impl DistinguishedFolder {
    pub fn id(self) -> &'static str {
        match self {
            DistinguishedFolder::Inbox => "inbox",
            DistinguishedFolder::DeletedItems => "deleteditems",
            DistinguishedFolder::SentItems => "sentitems",
            DistinguishedFolder::Drafts => "drafts",
            DistinguishedFolder::Calendar => "calendar",
            DistinguishedFolder::Contacts => "contacts",
            DistinguishedFolder::Outbox => "outbox",
            DistinguishedFolder::MsgFolderRoot => "msgfolderroot",
            DistinguishedFolder::PublicFoldersRoot => "publicfoldersroot",
        }
    }
}

/// A folder reference in a request: well-known name or explicit id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRef {
    Distinguished(DistinguishedFolder),
    Id(EwsId),
}

impl FolderRef {
    pub(crate) fn to_xml(&self) -> String {
        match self {
            FolderRef::Distinguished(d) => {
                format!("<t:DistinguishedFolderId Id=\"{}\"/>", d.id())
            }
            FolderRef::Id(id) => match &id.change_key {
                Some(ck) => format!("<t:FolderId Id=\"{}\" ChangeKey=\"{}\"/>", id.id, ck),
                None => format!("<t:FolderId Id=\"{}\"/>", id.id),
            },
        }
    }
}

/// Render a field locator as a t: property reference element.
pub fn locator_xml(locator: &EwsLocator) -> String {
    match locator {
        EwsLocator::FieldUri(uri) => format!("<t:FieldURI FieldURI=\"{}\"/>", uri),
        EwsLocator::IndexedFieldUri { uri, index } => format!(
            "<t:IndexedFieldURI FieldURI=\"{}\" FieldIndex=\"{}\"/>",
            uri, index
        ),
        EwsLocator::ExtendedTag { tag, ptype } => format!(
            "<t:ExtendedFieldURI PropertyTag=\"0x{:x}\" PropertyType=\"{}\"/>",
            tag,
            ptype.ews_name()
        ),
        EwsLocator::ExtendedSetId { set, id, ptype } => format!(
            "<t:ExtendedFieldURI DistinguishedPropertySetId=\"{}\" PropertyId=\"{}\" PropertyType=\"{}\"/>",
            set.ews_name(),
            id,
            ptype.ews_name()
        ),
        EwsLocator::ExtendedSetName { set, name } => format!(
            "<t:ExtendedFieldURI DistinguishedPropertySetId=\"{}\" PropertyName=\"{}\" PropertyType=\"String\"/>",
            set.ews_name(),
            name
        ),
    }
}

/// Canonical key a locator's value appears under in a parsed response.
pub fn locator_response_key(locator: &EwsLocator) -> String {
    match locator {
        EwsLocator::FieldUri(uri) => uri
            .rsplit(':')
            .next()
            .unwrap_or(uri)
            .to_string(),
        EwsLocator::IndexedFieldUri { index, .. } => (*index).to_string(),
        EwsLocator::ExtendedTag { tag, .. } => format!("tag:0x{:x}", tag),
        EwsLocator::ExtendedSetId { set, id, .. } => format!("id:{}:{}", set.ews_name(), id),
        EwsLocator::ExtendedSetName { set, name } => format!("name:{}:{}", set.ews_name(), name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;

    #[test]
    fn extended_tag_rendering() {
        let xml = locator_xml(field::get("imapUid").ews_locator());
        assert_eq!(
            xml,
            "<t:ExtendedFieldURI PropertyTag=\"0xe23\" PropertyType=\"Integer\"/>"
        );
    }

    #[test]
    fn distinguished_set_rendering() {
        let xml = locator_xml(field::get("email1").ews_locator());
        assert!(xml.contains("DistinguishedPropertySetId=\"Address\""));
        assert!(xml.contains("PropertyId=\"32900\""));
    }

    #[test]
    fn field_uri_response_key_is_local_part() {
        assert_eq!(
            locator_response_key(field::get("read").ews_locator()),
            "IsRead"
        );
    }
}
