/*
 * dav.rs
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

//! WebDAV session: the capability set implemented over Exchange 2003/2007
//! WebDAV verbs (PROPFIND, PROPPATCH, SEARCH, MKCOL, MOVE, COPY).

use std::sync::Arc;

use crate::codec::base64;
use crate::dav::{
    build_mkcol, build_propfind, build_proppatch, build_search, parse_multistatus,
    MultiStatusResponse, Traversal,
};
use crate::error::GatewayError;
use crate::field::{self, values};
use crate::http::{encode_path, encode_path_segment, HttpRequest, HttpResponse, HttpTransport};
use crate::mime::{self, Attachment, AttachmentSource};
use crate::vobject::vcalendar::VCalendar;

use super::auth::{self, AuthContext};
use super::{
    merge_attributes, Condition, Contact, Event, ExchangeSession, Folder, Item, ItemResult,
    Message, MessageFlags, SessionConfig, CALENDAR, CLASS_MAIL, CONTACTS, DRAFTS, INBOX, PUBLIC,
    SENT, TRASH,
};

/// Well-known folder aliases resolved at connect time, in mailbox order.
const WELL_KNOWN_FOLDERS: &[&str] = &[
    "inbox",
    "deleteditems",
    "sentitems",
    "sendmsg",
    "drafts",
    "calendar",
    "contacts",
    "outbox",
];

const FOLDER_PROPERTIES: &[&str] = &[
    "folderclass",
    "displayname",
    "hassubs",
    "nosubs",
    "unreadcount",
    "contenttag",
    "uidNext",
];

const MESSAGE_PROPERTIES: &[&str] = &[
    "uid",
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
    "permanenturl",
];

const EVENT_PROPERTIES: &[&str] = &[
    "displayname",
    "urlcompname",
    "etag",
    "instancetype",
    "contentclass",
];

const CONTACT_PROPERTIES: &[&str] = &[
    "urlcompname",
    "etag",
    "displayname",
    "cn",
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

pub struct DavSession {
    transport: Arc<dyn HttpTransport>,
    config: SessionConfig,
    email: String,
    /// Mailbox root path on the server, always slash-terminated.
    mail_path: String,
    inbox_url: String,
    deleteditems_url: String,
    sentitems_url: String,
    sendmsg_url: String,
    drafts_url: String,
    calendar_url: String,
    contacts_url: String,
    outbox_url: String,
    /// Public folder root, absent when the store has none.
    public_url: Option<String>,
}

impl std::fmt::Debug for DavSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DavSession")
            .field("email", &self.email)
            .field("mail_path", &self.mail_path)
            .finish_non_exhaustive()
    }
}

impl DavSession {
    /// Authenticate and resolve the well-known folder URLs. Fails when the
    /// mailbox does not answer WebDAV, which is the signal to fall back to
    /// EWS.
    pub fn connect(
        transport: Arc<dyn HttpTransport>,
        config: SessionConfig,
    ) -> Result<DavSession, GatewayError> {
        let context = auth::login(transport.as_ref(), &config)?;
        Self::with_context(transport, config, context)
    }

    fn with_context(
        transport: Arc<dyn HttpTransport>,
        config: SessionConfig,
        context: AuthContext,
    ) -> Result<DavSession, GatewayError> {
        let mut mail_path = context.mail_path.clone();
        if !mail_path.ends_with('/') {
            mail_path.push('/');
        }
        let mail_url = auth::absolutize(&config.base_url, &mail_path);
        let body = build_propfind(WELL_KNOWN_FOLDERS);
        let response = transport.execute(
            HttpRequest::new("PROPFIND", &mail_url)
                .header("Depth", "0")
                .body("text/xml; charset=UTF-8", body),
        )?;
        if response.status != 207 {
            return Err(GatewayError::http(
                response.status,
                format!("mailbox {} does not answer PROPFIND", mail_path),
            ));
        }
        let responses = parse_multistatus(&response.body)?;
        let first = responses.first().ok_or_else(|| {
            GatewayError::malformed_at("empty multistatus for mailbox root", &mail_path)
        })?;

        let folder_url = |alias: &str| -> Result<String, GatewayError> {
            let f = field::get(alias);
            first
                .property(f.response_name())
                .map(|v| v.trim_end_matches('/').to_string())
                .ok_or_else(|| {
                    GatewayError::malformed_at(
                        format!("mailbox has no {} folder", alias),
                        &mail_path,
                    )
                })
        };

        let inbox_url = folder_url("inbox")?;
        let deleteditems_url = folder_url("deleteditems")?;
        let sentitems_url = folder_url("sentitems")?;
        let sendmsg_url = folder_url("sendmsg")?;
        let drafts_url = folder_url("drafts")?;
        let calendar_url = folder_url("calendar")?;
        let contacts_url = folder_url("contacts")?;
        let outbox_url = folder_url("outbox")?;

        let mut session = DavSession {
            email: context.email,
            mail_path,
            inbox_url,
            deleteditems_url,
            sentitems_url,
            sendmsg_url,
            drafts_url,
            calendar_url,
            contacts_url,
            outbox_url,
            public_url: None,
            transport,
            config,
        };

        // Public folder discovery is best effort; many stores have none.
        let public_url = auth::absolutize(&session.config.base_url, "/public/");
        match session.propfind(&public_url, "0", &["displayname"]) {
            Ok(_) => session.public_url = Some(public_url.trim_end_matches('/').to_string()),
            Err(e) => log::debug!("no public folder store: {}", e),
        }

        Ok(session)
    }

    /// Map a logical folder path to its server URL.
    fn folder_url(&self, path: &str) -> String {
        let (root, rest) = match path.find('/') {
            Some(pos) => (&path[..pos], &path[pos + 1..]),
            None => (path, ""),
        };
        let base = match root {
            INBOX => &self.inbox_url,
            TRASH => &self.deleteditems_url,
            DRAFTS => &self.drafts_url,
            SENT => &self.sentitems_url,
            CALENDAR => &self.calendar_url,
            CONTACTS => &self.contacts_url,
            PUBLIC => {
                return match &self.public_url {
                    Some(url) if rest.is_empty() => url.clone(),
                    Some(url) => format!("{}/{}", url, encode_path(rest)),
                    None => auth::absolutize(&self.config.base_url, "/public/"),
                }
            }
            "" => {
                return auth::absolutize(
                    &self.config.base_url,
                    self.mail_path.trim_end_matches('/'),
                )
            }
            _ => {
                let full = format!("{}{}", self.mail_path, encode_path(path));
                return auth::absolutize(&self.config.base_url, &full);
            }
        };
        if rest.is_empty() {
            base.clone()
        } else {
            format!("{}/{}", base, encode_path(rest))
        }
    }

    fn item_url(&self, folder_path: &str, name: &str) -> String {
        format!(
            "{}/{}",
            self.folder_url(folder_path),
            encode_path_segment(name)
        )
    }

    fn check(&self, response: &HttpResponse, path: &str) -> Result<(), GatewayError> {
        match response.status {
            200..=299 => Ok(()),
            401 => Err(GatewayError::AuthFailed(format!(
                "session rejected at {}",
                path
            ))),
            404 | 410 => Err(GatewayError::NotFound {
                path: path.to_string(),
            }),
            412 => Err(GatewayError::PreconditionFailed {
                path: path.to_string(),
            }),
            // Exchange answers 440 when the token expired mid-session.
            440 => Err(GatewayError::http(403, format!("session timeout at {}", path))),
            status => Err(GatewayError::http(status, format!("request failed at {}", path))),
        }
    }

    fn propfind(
        &self,
        url: &str,
        depth: &str,
        aliases: &[&str],
    ) -> Result<Vec<MultiStatusResponse>, GatewayError> {
        let response = self.transport.execute(
            HttpRequest::new("PROPFIND", url)
                .header("Depth", depth)
                .body("text/xml; charset=UTF-8", build_propfind(aliases)),
        )?;
        self.check(&response, url)?;
        parse_multistatus(&response.body)
    }

    fn search(
        &self,
        url: &str,
        traversal: Traversal,
        aliases: &[&str],
        condition: Option<&Condition>,
    ) -> Result<Vec<MultiStatusResponse>, GatewayError> {
        let scope = auth::url_path(url).unwrap_or_else(|| url.to_string());
        let clause = condition.map(|c| c.to_dav_sql());
        let body = build_search(aliases, &scope, traversal, clause.as_deref());
        let response = self.transport.execute(
            HttpRequest::new("SEARCH", url).body("text/xml; charset=UTF-8", body),
        )?;
        self.check(&response, url)?;
        parse_multistatus(&response.body)
    }

    fn proppatch(
        &self,
        url: &str,
        set: &[(&str, &str)],
        remove: &[&str],
    ) -> Result<HttpResponse, GatewayError> {
        let body = build_proppatch(set, remove)?;
        let response = self.transport.execute(
            HttpRequest::new("PROPPATCH", url).body("text/xml; charset=UTF-8", body),
        )?;
        self.check(&response, url)?;
        Ok(response)
    }

    fn build_folder(&self, path: &str, resp: &MultiStatusResponse) -> Folder {
        let prop = |alias: &str| resp.property(field::get(alias).response_name());
        let folder_class = prop("folderclass").unwrap_or(CLASS_MAIL).to_string();
        Folder {
            path: path.to_string(),
            folder_url: resp.href.clone(),
            display_name: prop("displayname").unwrap_or_default().to_string(),
            folder_class,
            unread_count: prop("unreadcount").and_then(|v| v.parse().ok()),
            has_children: prop("hassubs").map(values::parse_dav_bool).unwrap_or(false),
            no_inferiors: prop("nosubs").map(values::parse_dav_bool).unwrap_or(false),
            ctag: prop("contenttag").map(str::to_string),
            uid_next: prop("uidNext").and_then(|v| v.parse().ok()),
        }
    }

    fn build_message(&self, resp: &MultiStatusResponse) -> Result<Message, GatewayError> {
        let prop = |alias: &str| resp.property(field::get(alias).response_name());
        let imap_uid: u64 = prop("imapUid")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| GatewayError::malformed_at("message without IMAP uid", &resp.href))?;
        let message_flags: u64 = prop("messageFlags")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let last_verb = prop("lastVerbExecuted").unwrap_or("");
        Ok(Message {
            item_url: resp.href.clone(),
            permanent_url: prop("permanenturl").map(str::to_string),
            uid: prop("uid").map(str::to_string),
            imap_uid,
            size: prop("messageSize").and_then(|v| v.parse().ok()).unwrap_or(0),
            date: prop("date").map(str::to_string),
            flags: MessageFlags {
                read: prop("read").map(values::parse_dav_bool).unwrap_or(false),
                deleted: prop("deleted") == Some("1"),
                junk: prop("junk").map(values::parse_dav_bool).unwrap_or(false),
                flagged: prop("flagStatus") == Some("2"),
                draft: message_flags & 0x8 != 0,
                answered: last_verb == "102" || last_verb == "103",
                forwarded: last_verb == "104",
            },
        })
    }

    /// Locate an item whose permanent or computed URL went stale: search
    /// the folder by url-compatible name and return its current href.
    fn search_by_urlcompname(
        &self,
        folder_url: &str,
        name: &str,
    ) -> Result<MultiStatusResponse, GatewayError> {
        let urlcompname = encode_path_segment(name);
        let condition = Condition::EqualTo("urlcompname", urlcompname);
        let mut found = self.search(
            folder_url,
            Traversal::Shallow,
            &["urlcompname", "etag", "permanenturl", "contentclass"],
            Some(&condition),
        )?;
        if found.is_empty() {
            return Err(GatewayError::NotFound {
                path: format!("{}/{}", folder_url, name),
            });
        }
        Ok(found.remove(0))
    }

    fn get_body(&self, url: &str) -> Result<HttpResponse, GatewayError> {
        let response = self
            .transport
            .execute(HttpRequest::new("GET", url).header("Translate", "f"))?;
        self.check(&response, url)?;
        Ok(response)
    }

    fn move_or_copy(
        &self,
        verb: &str,
        source_url: &str,
        destination_url: &str,
        allow_rename: bool,
    ) -> Result<(), GatewayError> {
        let mut request = HttpRequest::new(verb, source_url)
            .header("Destination", destination_url)
            .header("Overwrite", "f");
        if allow_rename {
            request = request.header("Allow-Rename", "t");
        }
        let response = self.transport.execute(request)?;
        self.check(&response, source_url)
    }

    /// Wrap a fixed calendar in the MIME envelope Exchange stores events
    /// as: multipart/alternative with an optional plain-text description
    /// part and the base64 text/calendar part.
    fn build_calendar_envelope(calendar: &VCalendar) -> Vec<u8> {
        let method = calendar.method().unwrap_or("PUBLISH");
        let content_class = if method == "PUBLISH" {
            "urn:content-classes:appointment"
        } else {
            "urn:content-classes:calendarmessage"
        };
        let boundary = format!("----=_NextPart_{:016x}", rand::random::<u64>());
        let mut out = String::new();
        out.push_str("Content-Transfer-Encoding: 7bit\r\n");
        out.push_str(&format!("Content-class: {}\r\n", content_class));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!(
            "Content-Type: multipart/alternative;\r\n\tboundary=\"{}\"\r\n\r\n",
            boundary
        ));
        if let Some(description) = calendar.event_description() {
            out.push_str(&format!("--{}\r\n", boundary));
            out.push_str("Content-Type: text/plain;\r\n\tcharset=\"utf-8\"\r\n");
            out.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
            out.push_str(description);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{}\r\n", boundary));
        out.push_str(&format!("Content-class: {}\r\n", content_class));
        out.push_str(&format!(
            "Content-Type: text/calendar;\r\n\tmethod={};\r\n\tcharset=\"utf-8\"\r\n",
            method
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        out.push_str(&base64::encode_folded(calendar.serialize().as_bytes()));
        out.push_str(&format!("--{}--\r\n", boundary));
        out.into_bytes()
    }

    /// Strip the From header; Exchange stamps the authenticated sender.
    fn remove_from_header(mime: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(mime.len());
        let mut skipping = false;
        let mut in_headers = true;
        for line in mime.split_inclusive(|&b| b == b'\n') {
            if in_headers {
                let trimmed: &[u8] = if line.ends_with(b"\r\n") {
                    &line[..line.len() - 2]
                } else if line.ends_with(b"\n") {
                    &line[..line.len() - 1]
                } else {
                    line
                };
                if trimmed.is_empty() {
                    in_headers = false;
                } else if skipping && (line[0] == b' ' || line[0] == b'\t') {
                    continue;
                } else {
                    skipping = line.len() >= 5 && line[..5].eq_ignore_ascii_case(b"from:");
                    if skipping {
                        continue;
                    }
                }
            }
            out.extend_from_slice(line);
        }
        out
    }
}

impl ExchangeSession for DavSession {
    fn email(&self) -> &str {
        &self.email
    }

    fn get_folder(&mut self, path: &str) -> Result<Folder, GatewayError> {
        let url = self.folder_url(path);
        let responses = self.propfind(&url, "0", FOLDER_PROPERTIES)?;
        let first = responses
            .first()
            .ok_or_else(|| GatewayError::malformed_at("empty folder multistatus", path))?;
        Ok(self.build_folder(path, first))
    }

    fn list_folders(
        &mut self,
        path: &str,
        condition: Option<&Condition>,
        recursive: bool,
    ) -> Result<Vec<Folder>, GatewayError> {
        let url = self.folder_url(path);
        let mut filters = vec![
            Condition::IsTrue("isfolder"),
            Condition::IsFalse("ishidden"),
        ];
        if let Some(c) = condition {
            filters.push(c.clone());
        }
        let traversal = if recursive {
            Traversal::Deep
        } else {
            Traversal::Shallow
        };
        let responses = self.search(
            &url,
            traversal,
            FOLDER_PROPERTIES,
            Some(&Condition::And(filters)),
        )?;
        let base = url.trim_end_matches('/');
        let mut folders = Vec::with_capacity(responses.len());
        for resp in &responses {
            // Logical path from the href tail relative to the parent.
            let tail = resp
                .href
                .trim_end_matches('/')
                .strip_prefix(base)
                .map(|t| t.trim_start_matches('/'))
                .unwrap_or("");
            if tail.is_empty() {
                continue;
            }
            let sub_path = if path.is_empty() {
                tail.to_string()
            } else {
                format!("{}/{}", path.trim_end_matches('/'), tail)
            };
            folders.push(self.build_folder(&sub_path, resp));
        }
        Ok(folders)
    }

    fn create_folder(&mut self, path: &str, folder_class: &str) -> Result<(), GatewayError> {
        let url = self.folder_url(path);
        let body = build_mkcol(folder_class)?;
        let response = self.transport.execute(
            HttpRequest::new("MKCOL", &url).body("text/xml; charset=UTF-8", body),
        )?;
        match response.status {
            201 | 207 => Ok(()),
            // Already exists; creation is idempotent for clients that retry.
            405 => Ok(()),
            _ => self.check(&response, path),
        }
    }

    fn delete_folder(&mut self, path: &str) -> Result<(), GatewayError> {
        let url = self.folder_url(path);
        let response = self.transport.execute(HttpRequest::new("DELETE", &url))?;
        match response.status {
            404 => Ok(()),
            _ => self.check(&response, path),
        }
    }

    fn move_folder(&mut self, path: &str, target_path: &str) -> Result<(), GatewayError> {
        let source = self.folder_url(path);
        let destination = self.folder_url(target_path);
        self.move_or_copy("MOVE", &source, &destination, false)
    }

    fn refresh_folder(&mut self, folder: &mut Folder) -> Result<bool, GatewayError> {
        let fresh = self.get_folder(&folder.path)?;
        let changed = fresh.ctag != folder.ctag || fresh.uid_next != folder.uid_next;
        *folder = fresh;
        Ok(changed)
    }

    fn search_messages(
        &mut self,
        folder_path: &str,
        attributes: &[&str],
        condition: Option<&Condition>,
    ) -> Result<Vec<Message>, GatewayError> {
        let url = self.folder_url(folder_path);
        let aliases = merge_attributes(MESSAGE_PROPERTIES, attributes);
        let mut filters = vec![Condition::IsFalse("isfolder")];
        if let Some(c) = condition {
            filters.push(c.clone());
        }
        let responses = self.search(
            &url,
            Traversal::Shallow,
            &aliases,
            Some(&Condition::And(filters)),
        )?;
        let mut messages = Vec::with_capacity(responses.len());
        for resp in &responses {
            match self.build_message(resp) {
                Ok(message) => messages.push(message),
                Err(e) if self.config.delete_broken_items => {
                    log::warn!("deleting broken item {}: {}", resp.href, e);
                    let delete = self
                        .transport
                        .execute(HttpRequest::new("DELETE", &resp.href))?;
                    if delete.status >= 400 && delete.status != 404 {
                        log::warn!("unable to delete broken item {}", resp.href);
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
        let url = self.folder_url(folder_path);
        let aliases = merge_attributes(EVENT_PROPERTIES, attributes);
        let mut filters = vec![Condition::IsFalse("isfolder")];
        if let Some(c) = condition {
            filters.push(c.clone());
        }
        let responses = self.search(
            &url,
            Traversal::Shallow,
            &aliases,
            Some(&Condition::And(filters)),
        )?;
        let mut events = Vec::with_capacity(responses.len());
        for resp in &responses {
            let prop = |alias: &str| resp.property(field::get(alias).response_name());
            let name = prop("urlcompname")
                .or_else(|| prop("displayname"))
                .unwrap_or_else(|| item_name_of(&resp.href))
                .to_string();
            events.push(Event {
                href: resp.href.clone(),
                name,
                etag: prop("etag").map(str::to_string),
                instance_type: prop("instancetype").and_then(|v| v.parse().ok()),
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
        let url = self.folder_url(folder_path);
        let aliases = merge_attributes(CONTACT_PROPERTIES, attributes);
        let mut filters = vec![Condition::IsFalse("isfolder")];
        if let Some(c) = condition {
            filters.push(c.clone());
        }
        let responses = self.search(
            &url,
            Traversal::Shallow,
            &aliases,
            Some(&Condition::And(filters)),
        )?;
        let mut contacts = Vec::with_capacity(responses.len());
        for resp in &responses {
            let prop = |alias: &str| resp.property(field::get(alias).response_name());
            let mut properties = std::collections::HashMap::new();
            for alias in &aliases {
                if let Some(value) = prop(alias) {
                    properties.insert(alias.to_string(), value.to_string());
                }
            }
            contacts.push(Contact {
                href: resp.href.clone(),
                name: prop("urlcompname")
                    .unwrap_or_else(|| item_name_of(&resp.href))
                    .to_string(),
                etag: prop("etag").map(str::to_string),
                properties,
            });
        }
        Ok(contacts)
    }

    fn get_item(&mut self, folder_path: &str, name: &str) -> Result<Item, GatewayError> {
        let url = self.item_url(folder_path, name);
        let response = match self.get_body(&url) {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                // The computed URL can go stale after a subject rename.
                let folder_url = self.folder_url(folder_path);
                let found = self.search_by_urlcompname(&folder_url, name)?;
                let retry_url = found
                    .property(field::get("permanenturl").response_name())
                    .map(str::to_string)
                    .unwrap_or_else(|| found.href.clone());
                self.get_body(&retry_url)?
            }
            Err(e) => return Err(e),
        };
        let etag = response.header("ETag").map(str::to_string);
        let content_class = response
            .header("Content-Type")
            .unwrap_or_default()
            .to_string();
        Ok(Item {
            href: url,
            name: name.to_string(),
            etag,
            content_class,
            body: response.body_text(),
        })
    }

    fn get_message_content(&mut self, message: &Message) -> Result<Vec<u8>, GatewayError> {
        let content = match self.get_body(&message.item_url) {
            Ok(response) => response.body,
            Err(e) if e.is_not_found() => match &message.permanent_url {
                Some(permanent) => self.get_body(permanent)?.body,
                None => return Err(e),
            },
            Err(e) => return Err(e),
        };
        // vendor binary envelopes are useless to clients; rebuild from
        // the item's fragmented properties instead
        let text = String::from_utf8_lossy(&content);
        let (headers, body) = split_message(&text);
        if !mime::needs_rebuild(headers) {
            return Ok(content);
        }
        let uid = message.uid.clone().unwrap_or_else(|| message.item_url.clone());
        let headers = headers.to_string();
        let body = body.to_string();
        let href = message.item_url.clone();
        mime::rebuild_message(&uid, &headers, &body, &href, self)
    }

    fn create_message(
        &mut self,
        folder_path: &str,
        name: &str,
        properties: &[(&'static str, String)],
        mime: &[u8],
    ) -> Result<(), GatewayError> {
        let url = self.item_url(folder_path, name);
        // Stamp the draft flag before the body lands so clients never see a
        // half-created message as received mail.
        let mut pre: Vec<(&str, &str)> = vec![("messageFlags", "9")];
        let mut post: Vec<(&str, &str)> = Vec::new();
        for (alias, value) in properties {
            if *alias == "messageFlags" {
                pre[0] = ("messageFlags", value.as_str());
            } else {
                post.push((alias, value.as_str()));
            }
        }
        self.proppatch(&url, &pre, &[])?;
        let response = self.transport.execute(
            HttpRequest::new("PUT", &url)
                .header("Translate", "f")
                .body("message/rfc822", mime.to_vec()),
        )?;
        self.check(&response, &url)?;
        if !post.is_empty() {
            // Flag patch after upload; losing it costs a flag, not the mail.
            if let Err(e) = self.proppatch(&url, &post, &[]) {
                log::warn!("unable to patch flags on {}: {}", url, e);
            }
        }
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
        self.proppatch(&message.item_url, &set, &[])?;
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
        let url = self.item_url(folder_path, name);
        let mut calendar = VCalendar::parse(ics)
            .map_err(|e| GatewayError::malformed_at(format!("invalid calendar body: {}", e), &url))?;
        calendar.fix_vcalendar(&self.email);
        let body = Self::build_calendar_envelope(&calendar);

        let mut request = HttpRequest::new("PUT", &url)
            .header("Translate", "f")
            .header("Overwrite", "f");
        if let Some(tag) = etag {
            request = request.header("If-Match", tag);
        }
        if none_match {
            request = request.header("If-None-Match", "*");
        }
        let response = self
            .transport
            .execute(request.body("message/rfc822", body))?;
        self.check(&response, &url)?;
        Ok(ItemResult {
            status: response.status,
            etag: response.header("ETag").map(str::to_string),
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
        let url = self.item_url(folder_path, name);
        let mut set: Vec<(&str, &str)> = vec![("outlookmessageclass", "IPM.Contact")];
        let mut remove: Vec<&str> = Vec::new();
        for (alias, value) in properties {
            if value.is_empty() {
                remove.push(alias);
            } else {
                set.push((alias, value.as_str()));
            }
        }
        let body = build_proppatch(&set, &remove)?;
        let mut request = HttpRequest::new("PROPPATCH", &url);
        if let Some(tag) = etag {
            request = request.header("If-Match", tag);
        }
        if none_match {
            request = request.header("If-None-Match", "*");
        }
        let response = self
            .transport
            .execute(request.body("text/xml; charset=UTF-8", body))?;
        self.check(&response, &url)?;

        // PROPPATCH answers 207 with no etag; fetch the fresh one.
        let fresh_etag = self
            .propfind(&url, "0", &["etag"])?
            .first()
            .and_then(|r| r.property(field::get("etag").response_name()))
            .map(str::to_string);
        Ok(ItemResult {
            status: if none_match { 201 } else { 200 },
            etag: fresh_etag,
        })
    }

    fn move_item(&mut self, source_path: &str, target_path: &str) -> Result<(), GatewayError> {
        let source = self.folder_url(source_path);
        let destination = self.folder_url(target_path);
        self.move_or_copy("MOVE", &source, &destination, false)
    }

    fn copy_item(&mut self, source_path: &str, target_path: &str) -> Result<(), GatewayError> {
        let source = self.folder_url(source_path);
        let destination = self.folder_url(target_path);
        self.move_or_copy("COPY", &source, &destination, true)
    }

    fn move_to_trash(&mut self, message: &Message) -> Result<(), GatewayError> {
        let name = item_name_of(&message.item_url);
        let destination = format!("{}/{}", self.deleteditems_url, name);
        let response = self.transport.execute(
            HttpRequest::new("MOVE", &message.item_url)
                .header("Destination", &destination)
                .header("Allow-Rename", "t"),
        )?;
        match response.status {
            // Already gone counts as moved.
            404 => Ok(()),
            _ => self.check(&response, &message.item_url),
        }
    }

    fn delete_item(&mut self, folder_path: &str, name: &str) -> Result<(), GatewayError> {
        let url = self.item_url(folder_path, name);
        let response = self.transport.execute(HttpRequest::new("DELETE", &url))?;
        match response.status {
            404 => Ok(()),
            _ => self.check(&response, &url),
        }
    }

    fn send_message(&mut self, mime: &[u8]) -> Result<(), GatewayError> {
        let body = Self::remove_from_header(mime);
        let name = format!("{:032x}.EML", rand::random::<u128>());
        let draft_url = format!("{}/{}", self.drafts_url, name);
        let response = self.transport.execute(
            HttpRequest::new("PUT", &draft_url)
                .header("Translate", "f")
                .body("message/rfc822", body),
        )?;
        self.check(&response, &draft_url)?;
        // Moving the draft to the submission folder triggers delivery.
        let destination = format!("{}/{}", self.sendmsg_url, name);
        self.move_or_copy("MOVE", &draft_url, &destination, false)
    }

    fn is_expired(&mut self) -> bool {
        self.propfind(&self.inbox_url, "0", &["displayname"]).is_err()
    }
}

/// Attachments live as children of the item in the DAV hierarchy.
impl AttachmentSource for DavSession {
    fn list_attachments(&mut self, item_href: &str) -> Result<Vec<Attachment>, GatewayError> {
        let responses = self.propfind(item_href, "1", &["displayname", "contentclass"])?;
        let base = item_href.trim_end_matches('/');
        let mut attachments = Vec::new();
        for resp in &responses {
            if resp.href.trim_end_matches('/') == base {
                continue;
            }
            let prop = |alias: &str| resp.property(field::get(alias).response_name());
            let name = prop("displayname")
                .unwrap_or_else(|| item_name_of(&resp.href))
                .to_string();
            let is_message = prop("contentclass") == Some("urn:content-classes:message");
            attachments.push(Attachment {
                name,
                href: resp.href.clone(),
                content_id: None,
                is_message,
            });
        }
        Ok(attachments)
    }

    fn attachment_content_type(
        &mut self,
        attachment: &Attachment,
    ) -> Result<String, GatewayError> {
        let response = self
            .transport
            .execute(HttpRequest::new("HEAD", &attachment.href))?;
        self.check(&response, &attachment.href)?;
        let header = response.header("Content-Type").ok_or_else(|| {
            GatewayError::malformed_at("attachment without content type", &attachment.href)
        })?;
        let media_type = header.split(';').next().unwrap_or(header).trim();
        Ok(media_type.to_string())
    }

    fn attachment_content(&mut self, attachment: &Attachment) -> Result<Vec<u8>, GatewayError> {
        Ok(self.get_body(&attachment.href)?.body)
    }

    fn message_content(&mut self, href: &str) -> Result<Vec<u8>, GatewayError> {
        Ok(self.get_body(href)?.body)
    }
}

/// Last path segment of an item href.
fn item_name_of(href: &str) -> &str {
    href.trim_end_matches('/').rsplit('/').next().unwrap_or(href)
}

/// Split raw RFC 822 text into its header block and body.
fn split_message(text: &str) -> (&str, &str) {
    match text.find("\r\n\r\n") {
        Some(pos) => (&text[..pos + 2], &text[pos + 4..]),
        None => match text.find("\n\n") {
            Some(pos) => (&text[..pos + 1], &text[pos + 2..]),
            None => (text, ""),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_header_stripped_with_continuation() {
        let mime = b"From: Someone <a@b.c>\r\n\tvia relay\r\nTo: x@y.z\r\nSubject: hi\r\n\r\nFrom: not a header\r\n";
        let out = DavSession::remove_from_header(mime);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "To: x@y.z\r\nSubject: hi\r\n\r\nFrom: not a header\r\n"
        );
    }

    #[test]
    fn item_name_from_href() {
        assert_eq!(
            item_name_of("https://mail.example.net/exchange/jdoe/Inbox/hello.EML"),
            "hello.EML"
        );
    }
}
