/*
 * ews.rs
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

//! EWS session: the capability set implemented over Exchange Web Services,
//! used when the mailbox no longer answers WebDAV.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::ews::{
    self, parse_response, DistinguishedFolder, EwsId, EwsItem, EwsResponse, FolderRef,
    MessageDisposition,
};
use crate::field::values;
use crate::http::{encode_path_segment, HttpRequest, HttpTransport};
use crate::vobject::vcalendar::VCalendar;

use super::auth;
use super::{
    merge_attributes, Condition, Contact, Event, ExchangeSession, Folder, Item, ItemResult,
    Message, MessageFlags, SessionConfig, CALENDAR, CLASS_MAIL, CONTACTS, DRAFTS, INBOX, PUBLIC,
    SENT, TRASH,
};

const FOLDER_PROPERTIES: &[&str] = &[
    "folderDisplayName",
    "folderclass",
    "unreadcount",
    "hassubs",
    "contenttag",
];

const MESSAGE_PROPERTIES: &[&str] = &[
    "urlcompname",
    "imapUid",
    "messageSize",
    "junk",
    "flagStatus",
    "messageFlags",
    "lastVerbExecuted",
    "read",
    "deleted",
    "date",
];

const EVENT_PROPERTIES: &[&str] = &["urlcompname", "etag", "instancetype"];

const CONTACT_PROPERTIES: &[&str] = &[
    "urlcompname",
    "etag",
    "displayname",
    "sn",
    "givenName",
    "fileas",
    "email1",
    "email2",
    "email3",
    "homePhone",
    "mobile",
    "telephoneNumber",
    "o",
    "title",
    "department",
];

pub struct EwsSession {
    transport: Arc<dyn HttpTransport>,
    config: SessionConfig,
    email: String,
    /// SOAP endpoint URL.
    endpoint: String,
    /// Resolved folder ids by logical path.
    folder_ids: HashMap<String, EwsId>,
}

impl EwsSession {
    pub fn connect(
        transport: Arc<dyn HttpTransport>,
        config: SessionConfig,
    ) -> Result<EwsSession, GatewayError> {
        let context = auth::login(transport.as_ref(), &config)?;
        let endpoint = auth::absolutize(&config.base_url, "/ews/exchange.asmx");
        let mut session = EwsSession {
            transport,
            email: context.email,
            endpoint,
            folder_ids: HashMap::new(),
            config,
        };
        // Capability probe; failure here means no EWS either.
        session.call(
            ews::get_folder(
                &FolderRef::Distinguished(DistinguishedFolder::MsgFolderRoot),
                &[],
            ),
            "msgfolderroot",
        )?;
        Ok(session)
    }

    fn call(&self, body: Vec<u8>, path: &str) -> Result<EwsResponse, GatewayError> {
        let response = self.transport.execute(
            HttpRequest::new("POST", &self.endpoint).body("text/xml; charset=UTF-8", body),
        )?;
        match response.status {
            200 => {}
            401 => {
                return Err(GatewayError::AuthFailed(format!(
                    "EWS rejected credentials at {}",
                    path
                )))
            }
            status if response.is_redirect() => {
                return Err(GatewayError::http(
                    status,
                    format!("EWS session redirected at {}", path),
                ))
            }
            status => {
                return Err(GatewayError::http(
                    status,
                    format!("EWS request failed at {}", path),
                ))
            }
        }
        let parsed = parse_response(&response.body)?;
        parsed.check(path)?;
        Ok(parsed)
    }

    fn distinguished_root(path: &str) -> Option<DistinguishedFolder> {
        match path {
            INBOX => Some(DistinguishedFolder::Inbox),
            TRASH => Some(DistinguishedFolder::DeletedItems),
            DRAFTS => Some(DistinguishedFolder::Drafts),
            SENT => Some(DistinguishedFolder::SentItems),
            CALENDAR => Some(DistinguishedFolder::Calendar),
            CONTACTS => Some(DistinguishedFolder::Contacts),
            PUBLIC => Some(DistinguishedFolder::PublicFoldersRoot),
            "" => Some(DistinguishedFolder::MsgFolderRoot),
            _ => None,
        }
    }

    /// Resolve a logical path to a folder reference, walking unknown
    /// segments by display name and caching what was found.
    fn folder_ref(&mut self, path: &str) -> Result<FolderRef, GatewayError> {
        if let Some(root) = Self::distinguished_root(path) {
            return Ok(FolderRef::Distinguished(root));
        }
        if let Some(id) = self.folder_ids.get(path) {
            return Ok(FolderRef::Id(id.clone()));
        }
        let (parent_path, leaf) = split_path(path);
        let parent = self.folder_ref(parent_path)?;
        let restriction = Condition::EqualTo("folderDisplayName", leaf.to_string()).to_ews_xml();
        let found = self.call(
            ews::find_folder(&parent, false, &[], Some(&restriction)),
            path,
        )?;
        let id = found
            .items
            .first()
            .and_then(|item| item.id.clone())
            .ok_or_else(|| GatewayError::NotFound {
                path: path.to_string(),
            })?;
        self.folder_ids.insert(path.to_string(), id.clone());
        Ok(FolderRef::Id(id))
    }

    /// Actual folder id, also for well-known folders.
    fn folder_id(&mut self, path: &str) -> Result<EwsId, GatewayError> {
        if let Some(id) = self.folder_ids.get(path) {
            return Ok(id.clone());
        }
        let folder_ref = self.folder_ref(path)?;
        if let FolderRef::Id(id) = folder_ref {
            return Ok(id);
        }
        let found = self.call(ews::get_folder(&folder_ref, &[]), path)?;
        let id = found
            .items
            .first()
            .and_then(|item| item.id.clone())
            .ok_or_else(|| GatewayError::NotFound {
                path: path.to_string(),
            })?;
        self.folder_ids.insert(path.to_string(), id.clone());
        Ok(id)
    }

    fn build_folder(path: &str, item: &EwsItem) -> Folder {
        let field = |alias: &str| item.field_for(alias);
        Folder {
            path: path.to_string(),
            folder_url: item.id.as_ref().map(|id| id.id.clone()).unwrap_or_default(),
            display_name: field("folderDisplayName").unwrap_or_default().to_string(),
            folder_class: field("folderclass").unwrap_or(CLASS_MAIL).to_string(),
            unread_count: field("unreadcount").and_then(|v| v.parse().ok()),
            has_children: field("hassubs") == Some("true"),
            no_inferiors: false,
            ctag: field("contenttag").map(str::to_string),
            uid_next: None,
        }
    }

    fn build_message(item: &EwsItem) -> Result<Message, GatewayError> {
        let field = |alias: &str| item.field_for(alias);
        let id = item
            .id
            .as_ref()
            .ok_or_else(|| GatewayError::malformed("message without item id"))?;
        let imap_uid: u64 = field("imapUid")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| GatewayError::malformed_at("message without IMAP uid", &id.id))?;
        let message_flags: u64 = field("messageFlags")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let last_verb = field("lastVerbExecuted").unwrap_or("");
        Ok(Message {
            item_url: id.id.clone(),
            permanent_url: None,
            uid: field("urlcompname").map(str::to_string),
            imap_uid,
            size: field("messageSize").and_then(|v| v.parse().ok()).unwrap_or(0),
            date: field("date").map(str::to_string),
            flags: MessageFlags {
                read: field("read") == Some("true"),
                deleted: field("deleted") == Some("1"),
                junk: field("junk").map(values::parse_dav_bool).unwrap_or(false),
                flagged: field("flagStatus") == Some("2"),
                draft: message_flags & 0x8 != 0,
                answered: last_verb == "102" || last_verb == "103",
                forwarded: last_verb == "104",
            },
        })
    }

    /// Find one item in a folder by its url-compatible name.
    fn find_by_name(
        &mut self,
        folder_path: &str,
        name: &str,
        aliases: &[&str],
    ) -> Result<Option<EwsItem>, GatewayError> {
        let parent = self.folder_ref(folder_path)?;
        let restriction =
            Condition::EqualTo("urlcompname", encode_path_segment(name)).to_ews_xml();
        let mut found = self.call(
            ews::find_item(&parent, aliases, Some(&restriction), Some(1)),
            folder_path,
        )?;
        if found.items.is_empty() {
            return Ok(None);
        }
        Ok(Some(found.items.remove(0)))
    }

    fn search_items(
        &mut self,
        folder_path: &str,
        aliases: &[&str],
        condition: Option<&Condition>,
    ) -> Result<Vec<EwsItem>, GatewayError> {
        let parent = self.folder_ref(folder_path)?;
        let restriction = condition.map(|c| c.to_ews_xml());
        let found = self.call(
            ews::find_item(&parent, aliases, restriction.as_deref(), None),
            folder_path,
        )?;
        Ok(found.items)
    }

    fn fix_calendar_body(&self, ics: &str, path: &str) -> Result<String, GatewayError> {
        let mut calendar = VCalendar::parse(ics)
            .map_err(|e| GatewayError::malformed_at(format!("invalid calendar body: {}", e), path))?;
        calendar.fix_vcalendar(&self.email);
        Ok(calendar.serialize())
    }
}

impl ExchangeSession for EwsSession {
    fn email(&self) -> &str {
        &self.email
    }

    fn get_folder(&mut self, path: &str) -> Result<Folder, GatewayError> {
        let folder_ref = self.folder_ref(path)?;
        let found = self.call(ews::get_folder(&folder_ref, FOLDER_PROPERTIES), path)?;
        let item = found
            .items
            .first()
            .ok_or_else(|| GatewayError::NotFound {
                path: path.to_string(),
            })?;
        Ok(Self::build_folder(path, item))
    }

    fn list_folders(
        &mut self,
        path: &str,
        condition: Option<&Condition>,
        recursive: bool,
    ) -> Result<Vec<Folder>, GatewayError> {
        let parent = self.folder_ref(path)?;
        let restriction = condition.map(|c| c.to_ews_xml());
        let found = self.call(
            ews::find_folder(&parent, recursive, FOLDER_PROPERTIES, restriction.as_deref()),
            path,
        )?;
        let mut folders = Vec::with_capacity(found.items.len());
        for item in &found.items {
            let name = item.field_for("folderDisplayName").unwrap_or_default();
            let sub_path = if path.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", path.trim_end_matches('/'), name)
            };
            if let Some(id) = &item.id {
                self.folder_ids.insert(sub_path.clone(), id.clone());
            }
            folders.push(Self::build_folder(&sub_path, item));
        }
        Ok(folders)
    }

    fn create_folder(&mut self, path: &str, folder_class: &str) -> Result<(), GatewayError> {
        let (parent_path, leaf) = split_path(path);
        let parent = self.folder_ref(parent_path)?;
        let found = self.call(ews::create_folder(&parent, leaf, folder_class), path)?;
        if let Some(id) = found.items.first().and_then(|item| item.id.clone()) {
            self.folder_ids.insert(path.to_string(), id);
        }
        Ok(())
    }

    fn delete_folder(&mut self, path: &str) -> Result<(), GatewayError> {
        let id = match self.folder_id(path) {
            Ok(id) => id,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        self.folder_ids.remove(path);
        match self.call(ews::delete_folder(&id), path) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn move_folder(&mut self, path: &str, target_path: &str) -> Result<(), GatewayError> {
        let id = self.folder_id(path)?;
        let (target_parent, target_leaf) = split_path(target_path);
        let (_, source_leaf) = split_path(path);
        if target_leaf != source_leaf {
            log::warn!("folder rename ignored: {} -> {}", source_leaf, target_leaf);
        }
        let target = self.folder_ref(target_parent)?;
        self.folder_ids.remove(path);
        self.call(ews::move_folder(&id, &target), path)?;
        Ok(())
    }

    fn refresh_folder(&mut self, folder: &mut Folder) -> Result<bool, GatewayError> {
        let fresh = self.get_folder(&folder.path)?;
        let changed = fresh.ctag != folder.ctag;
        *folder = fresh;
        Ok(changed)
    }

    fn search_messages(
        &mut self,
        folder_path: &str,
        attributes: &[&str],
        condition: Option<&Condition>,
    ) -> Result<Vec<Message>, GatewayError> {
        let aliases = merge_attributes(MESSAGE_PROPERTIES, attributes);
        let items = self.search_items(folder_path, &aliases, condition)?;
        let mut messages = Vec::with_capacity(items.len());
        for item in &items {
            match Self::build_message(item) {
                Ok(message) => messages.push(message),
                Err(e) if self.config.delete_broken_items => {
                    log::warn!("deleting broken item: {}", e);
                    if let Some(id) = &item.id {
                        let delete =
                            self.call(ews::delete_item(id, ews::DeleteType::HardDelete), folder_path);
                        if let Err(e) = delete {
                            log::warn!("unable to delete broken item {}: {}", id.id, e);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
        messages.sort_by_key(|m| m.imap_uid);
        Ok(messages)
    }

    fn search_events(
        &mut self,
        folder_path: &str,
        attributes: &[&str],
        condition: Option<&Condition>,
    ) -> Result<Vec<Event>, GatewayError> {
        let aliases = merge_attributes(EVENT_PROPERTIES, attributes);
        let items = self.search_items(folder_path, &aliases, condition)?;
        let mut events = Vec::with_capacity(items.len());
        for item in &items {
            let id = match &item.id {
                Some(id) => id,
                None => continue,
            };
            events.push(Event {
                href: id.id.clone(),
                name: item
                    .field_for("urlcompname")
                    .map(str::to_string)
                    .unwrap_or_else(|| id.id.clone()),
                etag: id.change_key.clone(),
                instance_type: item.field_for("instancetype").and_then(|v| v.parse().ok()),
            });
        }
        Ok(events)
    }

    fn search_contacts(
        &mut self,
        folder_path: &str,
        attributes: &[&str],
        condition: Option<&Condition>,
    ) -> Result<Vec<Contact>, GatewayError> {
        let aliases = merge_attributes(CONTACT_PROPERTIES, attributes);
        let items = self.search_items(folder_path, &aliases, condition)?;
        let mut contacts = Vec::with_capacity(items.len());
        for item in &items {
            let id = match &item.id {
                Some(id) => id,
                None => continue,
            };
            let mut properties = HashMap::new();
            for alias in &aliases {
                if let Some(value) = item.field_for(alias) {
                    properties.insert(alias.to_string(), value.to_string());
                }
            }
            contacts.push(Contact {
                href: id.id.clone(),
                name: item
                    .field_for("urlcompname")
                    .map(str::to_string)
                    .unwrap_or_else(|| id.id.clone()),
                etag: id.change_key.clone(),
                properties,
            });
        }
        Ok(contacts)
    }

    fn get_item(&mut self, folder_path: &str, name: &str) -> Result<Item, GatewayError> {
        let found = self
            .find_by_name(folder_path, name, &["urlcompname"])?
            .ok_or_else(|| GatewayError::NotFound {
                path: format!("{}/{}", folder_path, name),
            })?;
        let id = found.id.ok_or_else(|| {
            GatewayError::malformed_at("item without id", folder_path)
        })?;
        let full = self.call(ews::get_item(&id, &[], true), folder_path)?;
        let item = full
            .items
            .first()
            .ok_or_else(|| GatewayError::NotFound {
                path: format!("{}/{}", folder_path, name),
            })?;
        let body = item
            .mime_content
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();
        Ok(Item {
            href: id.id.clone(),
            name: name.to_string(),
            etag: item.id.as_ref().and_then(|i| i.change_key.clone()),
            content_class: item.kind.clone(),
            body,
        })
    }

    fn get_message_content(&mut self, message: &Message) -> Result<Vec<u8>, GatewayError> {
        let id = EwsId::new(message.item_url.clone());
        let found = self.call(ews::get_item(&id, &[], true), &message.item_url)?;
        found
            .items
            .first()
            .and_then(|item| item.mime_content.clone())
            .ok_or_else(|| {
                GatewayError::malformed_at("item has no MIME content", &message.item_url)
            })
    }

    fn create_message(
        &mut self,
        folder_path: &str,
        name: &str,
        properties: &[(&'static str, String)],
        mime: &[u8],
    ) -> Result<(), GatewayError> {
        let folder = self.folder_ref(folder_path)?;
        let mut set: Vec<(&str, &str)> =
            vec![("urlcompname", name), ("messageFlags", "9")];
        for (alias, value) in properties {
            if *alias == "messageFlags" {
                set[1] = ("messageFlags", value.as_str());
            } else {
                set.push((alias, value.as_str()));
            }
        }
        self.call(
            ews::create_item_mime(&folder, mime, MessageDisposition::SaveOnly, &set),
            folder_path,
        )?;
        Ok(())
    }

    fn update_message(
        &mut self,
        message: &Message,
        properties: &[(&'static str, String)],
    ) -> Result<(), GatewayError> {
        let set: Vec<(&str, &str)> = properties
            .iter()
            .map(|(alias, value)| (*alias, value.as_str()))
            .collect();
        let id = EwsId::new(message.item_url.clone());
        self.call(ews::update_item(&id, &set), &message.item_url)?;
        Ok(())
    }

    fn create_or_update_event(
        &mut self,
        folder_path: &str,
        name: &str,
        ics: &str,
        etag: Option<&str>,
        none_match: bool,
    ) -> Result<ItemResult, GatewayError> {
        let path = format!("{}/{}", folder_path, name);
        let body = self.fix_calendar_body(ics, &path)?;
        let existing = self.find_by_name(folder_path, name, &["urlcompname"])?;

        if none_match && existing.is_some() {
            return Err(GatewayError::PreconditionFailed { path });
        }
        if let Some(tag) = etag {
            let current = existing
                .as_ref()
                .and_then(|item| item.id.as_ref())
                .and_then(|id| id.change_key.as_deref());
            if current != Some(tag) {
                return Err(GatewayError::PreconditionFailed { path });
            }
        }

        // EWS has no MIME update; replace the item.
        let created_new = existing.is_none();
        if let Some(id) = existing.and_then(|item| item.id) {
            match self.call(ews::delete_item(&id, ews::DeleteType::HardDelete), &path) {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        let folder = self.folder_ref(folder_path)?;
        let kind = if body.contains("BEGIN:VTODO") {
            "Task"
        } else {
            "CalendarItem"
        };
        let created = self.call(
            ews::create_item_mime_kind(
                &folder,
                kind,
                body.as_bytes(),
                MessageDisposition::SaveOnly,
                &[("urlcompname", &encode_path_segment(name))],
            ),
            &path,
        )?;
        let fresh_etag = created
            .items
            .first()
            .and_then(|item| item.id.as_ref())
            .and_then(|id| id.change_key.clone());
        Ok(ItemResult {
            status: if created_new { 201 } else { 200 },
            etag: fresh_etag,
        })
    }

    fn create_or_update_contact(
        &mut self,
        folder_path: &str,
        name: &str,
        properties: &[(&'static str, String)],
        etag: Option<&str>,
        none_match: bool,
    ) -> Result<ItemResult, GatewayError> {
        let path = format!("{}/{}", folder_path, name);
        let existing = self.find_by_name(folder_path, name, &["urlcompname"])?;

        if none_match && existing.is_some() {
            return Err(GatewayError::PreconditionFailed { path });
        }
        let set: Vec<(&str, &str)> = properties
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(alias, value)| (*alias, value.as_str()))
            .collect();

        match existing.and_then(|item| item.id) {
            Some(mut id) => {
                if let Some(tag) = etag {
                    if id.change_key.as_deref() != Some(tag) {
                        return Err(GatewayError::PreconditionFailed { path });
                    }
                    id.change_key = Some(tag.to_string());
                }
                let updated = self.call(ews::update_item(&id, &set), &path)?;
                let fresh_etag = updated
                    .items
                    .first()
                    .and_then(|item| item.id.as_ref())
                    .and_then(|i| i.change_key.clone());
                Ok(ItemResult {
                    status: 200,
                    etag: fresh_etag,
                })
            }
            None => {
                if etag.is_some() {
                    return Err(GatewayError::PreconditionFailed { path });
                }
                let folder = self.folder_ref(folder_path)?;
                let mut create_set = set;
                let encoded = encode_path_segment(name);
                create_set.push(("urlcompname", &encoded));
                let created = self.call(ews::create_contact(&folder, &create_set), &path)?;
                let fresh_etag = created
                    .items
                    .first()
                    .and_then(|item| item.id.as_ref())
                    .and_then(|i| i.change_key.clone());
                Ok(ItemResult {
                    status: 201,
                    etag: fresh_etag,
                })
            }
        }
    }

    fn move_item(&mut self, source_path: &str, target_path: &str) -> Result<(), GatewayError> {
        let (source_folder, name) = split_path(source_path);
        let item = self
            .find_by_name(source_folder, name, &["urlcompname"])?
            .and_then(|item| item.id)
            .ok_or_else(|| GatewayError::NotFound {
                path: source_path.to_string(),
            })?;
        let (target_folder, _) = split_path(target_path);
        let target = self.folder_ref(target_folder)?;
        self.call(ews::move_item(&item, &target), source_path)?;
        Ok(())
    }

    fn copy_item(&mut self, source_path: &str, target_path: &str) -> Result<(), GatewayError> {
        let (source_folder, name) = split_path(source_path);
        let item = self
            .find_by_name(source_folder, name, &["urlcompname"])?
            .and_then(|item| item.id)
            .ok_or_else(|| GatewayError::NotFound {
                path: source_path.to_string(),
            })?;
        let (target_folder, _) = split_path(target_path);
        let target = self.folder_ref(target_folder)?;
        self.call(ews::copy_item(&item, &target), source_path)?;
        Ok(())
    }

    fn move_to_trash(&mut self, message: &Message) -> Result<(), GatewayError> {
        let id = EwsId::new(message.item_url.clone());
        match self.call(
            ews::delete_item(&id, ews::DeleteType::MoveToDeletedItems),
            &message.item_url,
        ) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn delete_item(&mut self, folder_path: &str, name: &str) -> Result<(), GatewayError> {
        let existing = self.find_by_name(folder_path, name, &["urlcompname"])?;
        let id = match existing.and_then(|item| item.id) {
            Some(id) => id,
            None => return Ok(()),
        };
        match self.call(
            ews::delete_item(&id, ews::DeleteType::HardDelete),
            folder_path,
        ) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn send_message(&mut self, mime: &[u8]) -> Result<(), GatewayError> {
        let folder = FolderRef::Distinguished(DistinguishedFolder::SentItems);
        self.call(
            ews::create_item_mime(&folder, mime, MessageDisposition::SendAndSaveCopy, &[]),
            "sendmessage",
        )?;
        Ok(())
    }

    fn is_expired(&mut self) -> bool {
        self.call(
            ews::get_folder(&FolderRef::Distinguished(DistinguishedFolder::Inbox), &[]),
            "inbox",
        )
        .is_err()
    }
}

/// Split a logical path into parent and leaf.
fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
        None => ("", trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_splitting() {
        assert_eq!(split_path("INBOX/archive"), ("INBOX", "archive"));
        assert_eq!(split_path("INBOX"), ("", "INBOX"));
        assert_eq!(split_path("a/b/c"), ("a/b", "c"));
    }

    #[test]
    fn distinguished_roots() {
        assert_eq!(
            EwsSession::distinguished_root("INBOX"),
            Some(DistinguishedFolder::Inbox)
        );
        assert_eq!(
            EwsSession::distinguished_root("Trash"),
            Some(DistinguishedFolder::DeletedItems)
        );
        assert_eq!(EwsSession::distinguished_root("INBOX/sub"), None);
    }
}
