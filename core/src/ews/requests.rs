/*
 * requests.rs
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

//! SOAP 1.1 request envelopes for the EWS operations the session uses.

use quick_xml::escape::escape;

use crate::codec::base64::encode_folded;
use crate::ews::{locator_xml, EwsId, FolderRef, MESSAGES_NS, SOAP_NS, TYPES_NS};
use crate::field::{self, EwsLocator};

const SERVER_VERSION: &str = "Exchange2007_SP1";

fn envelope(operation: &str, body: &str) -> Vec<u8> {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soap:Envelope xmlns:soap=\"{soap}\">\
         <soap:Header><t:RequestServerVersion Version=\"{version}\" xmlns:t=\"{types}\"/></soap:Header>\
         <soap:Body><m:{op} xmlns:m=\"{messages}\" xmlns:t=\"{types}\">{body}</m:{op}></soap:Body>\
         </soap:Envelope>",
        soap = SOAP_NS,
        version = SERVER_VERSION,
        types = TYPES_NS,
        messages = MESSAGES_NS,
        op = operation,
        body = body
    )
    .into_bytes()
}

fn additional_properties(aliases: &[&str]) -> String {
    if aliases.is_empty() {
        return String::new();
    }
    let mut out = String::from("<t:AdditionalProperties>");
    for alias in aliases {
        out.push_str(&locator_xml(field::get(alias).ews_locator()));
    }
    out.push_str("</t:AdditionalProperties>");
    out
}

fn item_id_xml(id: &EwsId) -> String {
    match &id.change_key {
        Some(ck) => format!("<t:ItemId Id=\"{}\" ChangeKey=\"{}\"/>", id.id, ck),
        None => format!("<t:ItemId Id=\"{}\"/>", id.id),
    }
}

pub fn get_folder(folder: &FolderRef, aliases: &[&str]) -> Vec<u8> {
    envelope(
        "GetFolder",
        &format!(
            "<m:FolderShape><t:BaseShape>IdOnly</t:BaseShape>{}</m:FolderShape>\
             <m:FolderIds>{}</m:FolderIds>",
            additional_properties(aliases),
            folder.to_xml()
        ),
    )
}

pub fn find_folder(
    parent: &FolderRef,
    deep: bool,
    aliases: &[&str],
    restriction: Option<&str>,
) -> Vec<u8> {
    let traversal = if deep { "Deep" } else { "Shallow" };
    let restriction_xml = restriction
        .map(|r| format!("<m:Restriction>{}</m:Restriction>", r))
        .unwrap_or_default();
    envelope(
        "FindFolder",
        &format!(
            "<m:FolderShape><t:BaseShape>IdOnly</t:BaseShape>{}</m:FolderShape>\
             {}<m:ParentFolderIds>{}</m:ParentFolderIds>",
            additional_properties(aliases),
            restriction_xml,
            parent.to_xml()
        ),
    )
}

pub fn create_folder(parent: &FolderRef, name: &str, folder_class: &str) -> Vec<u8> {
    envelope(
        "CreateFolder",
        &format!(
            "<m:ParentFolderId>{}</m:ParentFolderId>\
             <m:Folders><t:Folder><t:FolderClass>{}</t:FolderClass>\
             <t:DisplayName>{}</t:DisplayName></t:Folder></m:Folders>",
            parent.to_xml(),
            escape(folder_class),
            escape(name)
        ),
    )
}

pub fn delete_folder(folder: &EwsId) -> Vec<u8> {
    with_attribute(
        envelope(
            "DeleteFolder",
            &format!(
                "<m:FolderIds><t:FolderId Id=\"{}\"/></m:FolderIds>",
                folder.id
            ),
        ),
        "DeleteFolder",
        "DeleteType=\"HardDelete\"",
    )
}

pub fn move_folder(folder: &EwsId, target: &FolderRef) -> Vec<u8> {
    envelope(
        "MoveFolder",
        &format!(
            "<m:ToFolderId>{}</m:ToFolderId>\
             <m:FolderIds><t:FolderId Id=\"{}\"/></m:FolderIds>",
            target.to_xml(),
            folder.id
        ),
    )
}

/// Some operations carry attributes on the operation element itself; the
/// envelope helper does not know about them, so they are spliced in here.
fn with_attribute(envelope: Vec<u8>, operation: &str, attribute: &str) -> Vec<u8> {
    let needle = format!("<m:{} ", operation);
    let replacement = format!("<m:{} {} ", operation, attribute);
    String::from_utf8_lossy(&envelope)
        .replace(&needle, &replacement)
        .into_bytes()
}

pub fn find_item(
    parent: &FolderRef,
    aliases: &[&str],
    restriction: Option<&str>,
    max_returned: Option<u32>,
) -> Vec<u8> {
    let view = match max_returned {
        Some(max) => format!(
            "<m:IndexedPageItemView MaxEntriesReturned=\"{}\" Offset=\"0\" BasePoint=\"Beginning\"/>",
            max
        ),
        None => "<m:IndexedPageItemView Offset=\"0\" BasePoint=\"Beginning\"/>".to_string(),
    };
    let restriction_xml = restriction
        .map(|r| format!("<m:Restriction>{}</m:Restriction>", r))
        .unwrap_or_default();
    envelope(
        "FindItem",
        &format!(
            "<m:ItemShape><t:BaseShape>IdOnly</t:BaseShape>{}</m:ItemShape>\
             {}{}<m:ParentFolderIds>{}</m:ParentFolderIds>",
            additional_properties(aliases),
            view,
            restriction_xml,
            parent.to_xml()
        ),
    )
}

pub fn get_item(item: &EwsId, aliases: &[&str], include_mime: bool) -> Vec<u8> {
    let mime = if include_mime {
        "<t:IncludeMimeContent>true</t:IncludeMimeContent>"
    } else {
        ""
    };
    envelope(
        "GetItem",
        &format!(
            "<m:ItemShape><t:BaseShape>IdOnly</t:BaseShape>{}{}</m:ItemShape>\
             <m:ItemIds>{}</m:ItemIds>",
            mime,
            additional_properties(aliases),
            item_id_xml(item)
        ),
    )
}

/// How CreateItem disposes of the new message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    SaveOnly,
    SendAndSaveCopy,
}

impl MessageDisposition {
    fn name(self) -> &'static str {
        match self {
            MessageDisposition::SaveOnly => "SaveOnly",
            MessageDisposition::SendAndSaveCopy => "SendAndSaveCopy",
        }
    }
}

/// CreateItem from raw MIME, plus extended property values set at create.
pub fn create_item_mime(
    folder: &FolderRef,
    mime: &[u8],
    disposition: MessageDisposition,
    properties: &[(&str, &str)],
) -> Vec<u8> {
    create_item_mime_kind(folder, "Message", mime, disposition, properties)
}

/// CreateItem from MIME content for an explicit item kind; calendar items
/// upload their iCalendar body this way.
pub fn create_item_mime_kind(
    folder: &FolderRef,
    kind: &str,
    mime: &[u8],
    disposition: MessageDisposition,
    properties: &[(&str, &str)],
) -> Vec<u8> {
    let mut extended = String::new();
    for (alias, value) in properties {
        extended.push_str(&extended_property_xml(
            field::get(alias).ews_locator(),
            value,
        ));
    }
    let body = format!(
        "<m:SavedItemFolderId>{}</m:SavedItemFolderId>\
         <m:Items><t:{kind}><t:MimeContent>{}</t:MimeContent>{}</t:{kind}></m:Items>",
        folder.to_xml(),
        encode_folded(mime).replace("\r\n", ""),
        extended,
        kind = kind
    );
    with_attribute(
        envelope("CreateItem", &body),
        "CreateItem",
        &format!("MessageDisposition=\"{}\"", disposition.name()),
    )
}

/// CreateItem for a contact built from property values.
pub fn create_contact(folder: &FolderRef, set: &[(&str, &str)]) -> Vec<u8> {
    let mut properties = String::new();
    for (alias, value) in set {
        let locator = field::get(alias).ews_locator();
        match locator {
            EwsLocator::FieldUri(uri) => {
                let local = uri.rsplit(':').next().unwrap_or(uri);
                properties.push_str(&format!("<t:{n}>{v}</t:{n}>", n = local, v = escape(value)));
            }
            _ => properties.push_str(&extended_property_xml(locator, value)),
        }
    }
    let body = format!(
        "<m:SavedItemFolderId>{}</m:SavedItemFolderId>\
         <m:Items><t:Contact>{}</t:Contact></m:Items>",
        folder.to_xml(),
        properties
    );
    with_attribute(
        envelope("CreateItem", &body),
        "CreateItem",
        "MessageDisposition=\"SaveOnly\"",
    )
}

fn extended_property_xml(locator: &EwsLocator, value: &str) -> String {
    format!(
        "<t:ExtendedProperty>{}<t:Value>{}</t:Value></t:ExtendedProperty>",
        locator_xml(locator),
        escape(value)
    )
}

/// UpdateItem with AlwaysOverwrite resolution; a stale change key is still
/// rejected by the server with ErrorIrresolvableConflict.
pub fn update_item(item: &EwsId, set: &[(&str, &str)]) -> Vec<u8> {
    let mut changes = String::new();
    for (alias, value) in set {
        let locator = field::get(alias).ews_locator();
        // FieldURI properties update through their first-class element,
        // everything else through an ExtendedProperty value
        let item_value = match locator {
            EwsLocator::FieldUri(uri) => {
                let local = uri.rsplit(':').next().unwrap_or(uri);
                format!("<t:{n}>{v}</t:{n}>", n = local, v = escape(value))
            }
            _ => extended_property_xml(locator, value),
        };
        changes.push_str(&format!(
            "<t:SetItemField>{}<t:Message>{}</t:Message></t:SetItemField>",
            locator_xml(locator),
            item_value
        ));
    }
    let body = format!(
        "<m:ItemChanges><t:ItemChange>{}<t:Updates>{}</t:Updates></t:ItemChange></m:ItemChanges>",
        item_id_xml(item),
        changes
    );
    with_attribute(
        envelope("UpdateItem", &body),
        "UpdateItem",
        "ConflictResolution=\"AlwaysOverwrite\" MessageDisposition=\"SaveOnly\"",
    )
}

pub fn move_item(item: &EwsId, target: &FolderRef) -> Vec<u8> {
    envelope(
        "MoveItem",
        &format!(
            "<m:ToFolderId>{}</m:ToFolderId><m:ItemIds>{}</m:ItemIds>",
            target.to_xml(),
            item_id_xml(item)
        ),
    )
}

pub fn copy_item(item: &EwsId, target: &FolderRef) -> Vec<u8> {
    envelope(
        "CopyItem",
        &format!(
            "<m:ToFolderId>{}</m:ToFolderId><m:ItemIds>{}</m:ItemIds>",
            target.to_xml(),
            item_id_xml(item)
        ),
    )
}

/// Item deletion mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteType {
    HardDelete,
    MoveToDeletedItems,
}

impl DeleteType {
    fn name(self) -> &'static str {
        match self {
            DeleteType::HardDelete => "HardDelete",
            DeleteType::MoveToDeletedItems => "MoveToDeletedItems",
        }
    }
}

pub fn delete_item(item: &EwsId, delete_type: DeleteType) -> Vec<u8> {
    with_attribute(
        envelope(
            "DeleteItem",
            &format!("<m:ItemIds>{}</m:ItemIds>", item_id_xml(item)),
        ),
        "DeleteItem",
        &format!("DeleteType=\"{}\"", delete_type.name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ews::DistinguishedFolder;

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn get_folder_distinguished() {
        let body = text(get_folder(
            &FolderRef::Distinguished(DistinguishedFolder::Inbox),
            &["folderclass", "unreadcount"],
        ));
        assert!(body.contains("<m:GetFolder"));
        assert!(body.contains("<t:DistinguishedFolderId Id=\"inbox\"/>"));
        assert!(body.contains("<t:BaseShape>IdOnly</t:BaseShape>"));
        assert!(body.contains("PropertyTag=\"0x3613\""));
    }

    #[test]
    fn get_item_includes_mime() {
        let body = text(get_item(&EwsId::new("AAMk"), &["etag"], true));
        assert!(body.contains("<t:IncludeMimeContent>true</t:IncludeMimeContent>"));
        assert!(body.contains("<t:ItemId Id=\"AAMk\"/>"));
    }

    #[test]
    fn create_item_disposition_attribute() {
        let body = text(create_item_mime(
            &FolderRef::Distinguished(DistinguishedFolder::Drafts),
            b"Subject: x\r\n\r\nbody",
            MessageDisposition::SaveOnly,
            &[],
        ));
        assert!(body.contains("MessageDisposition=\"SaveOnly\""));
        assert!(body.contains("<t:MimeContent>"));
    }

    #[test]
    fn update_item_carries_change_key() {
        let body = text(update_item(
            &EwsId::with_change_key("AAMk", "CQAAABYA"),
            &[("read", "true")],
        ));
        assert!(body.contains("ChangeKey=\"CQAAABYA\""));
        assert!(body.contains("ConflictResolution=\"AlwaysOverwrite\""));
        assert!(body.contains("<t:SetItemField>"));
    }

    #[test]
    fn delete_item_types() {
        assert!(text(delete_item(&EwsId::new("A"), DeleteType::HardDelete))
            .contains("DeleteType=\"HardDelete\""));
        assert!(
            text(delete_item(&EwsId::new("A"), DeleteType::MoveToDeletedItems))
                .contains("DeleteType=\"MoveToDeletedItems\"")
        );
    }

    #[test]
    fn find_item_restriction_embedded() {
        let body = text(find_item(
            &FolderRef::Distinguished(DistinguishedFolder::Inbox),
            &["imapUid"],
            Some("<t:IsEqualTo/>"),
            Some(100),
        ));
        assert!(body.contains("<m:Restriction><t:IsEqualTo/></m:Restriction>"));
        assert!(body.contains("MaxEntriesReturned=\"100\""));
    }
}
