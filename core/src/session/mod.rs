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

//! Exchange session: one capability set, two wire implementations.
//!
//! [`ExchangeSession`] is the surface the protocol front-ends call. The
//! WebDAV and EWS implementations are selected at connect time by probing
//! the server; both share the field table, the condition tree, and the
//! structured-text codecs. A session is owned by one thread; the keep-alive
//! helper in [`background`] only reads session output, never session state.

pub mod auth;
pub mod background;
pub mod dav;
pub mod ews;

use std::collections::HashMap;
use std::sync::Arc;

use quick_xml::escape::escape;

use crate::error::GatewayError;
use crate::field;
use crate::http::HttpTransport;

/// Logical folder names exposed to clients.
pub const INBOX: &str = "INBOX";
pub const TRASH: &str = "Trash";
pub const DRAFTS: &str = "Drafts";
pub const SENT: &str = "Sent";
pub const CALENDAR: &str = "calendar";
pub const CONTACTS: &str = "contacts";
pub const PUBLIC: &str = "public";

/// Outlook folder classes.
pub const CLASS_MAIL: &str = "IPF.Note";
pub const CLASS_CALENDAR: &str = "IPF.Appointment";
pub const CLASS_CONTACT: &str = "IPF.Contact";
pub const CLASS_TASK: &str = "IPF.Task";

/// Connection parameters for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// OWA base URL, e.g. `https://mail.example.net/exchange/`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Canonical address; derived from the mailbox path when absent.
    pub email: Option<String>,
    /// Delete items that cannot be parsed instead of failing the listing.
    pub delete_broken_items: bool,
}

/// A mail, calendar or contacts container.
#[derive(Debug, Clone, Default)]
pub struct Folder {
    /// Protocol-visible logical path.
    pub path: String,
    /// Backing URL (WebDAV) or folder id (EWS).
    pub folder_url: String,
    pub display_name: String,
    pub folder_class: String,
    pub unread_count: Option<u32>,
    pub has_children: bool,
    pub no_inferiors: bool,
    /// Folder change tag; compared for equality only.
    pub ctag: Option<String>,
    pub uid_next: Option<u64>,
}

impl Folder {
    pub fn is_calendar(&self) -> bool {
        self.folder_class == CLASS_CALENDAR
    }

    pub fn is_contact(&self) -> bool {
        self.folder_class == CLASS_CONTACT
    }
}

/// Message flags visible over IMAP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageFlags {
    pub read: bool,
    pub deleted: bool,
    pub junk: bool,
    pub flagged: bool,
    pub draft: bool,
    pub answered: bool,
    pub forwarded: bool,
}

/// A mail item as returned by a folder search.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub item_url: String,
    /// Location-independent URL used for the one-retry failover.
    pub permanent_url: Option<String>,
    pub uid: Option<String>,
    pub imap_uid: u64,
    pub size: u64,
    pub date: Option<String>,
    pub flags: MessageFlags,
}

/// A calendar or contact item fetched by name.
#[derive(Debug, Clone, Default)]
pub struct Item {
    pub href: String,
    pub name: String,
    pub etag: Option<String>,
    pub content_class: String,
    /// iCalendar or vCard body.
    pub body: String,
}

/// An event row from a calendar search.
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub href: String,
    pub name: String,
    pub etag: Option<String>,
    /// Calendar instance type; None distinguishes tasks from appointments.
    pub instance_type: Option<i64>,
}

/// A contact row, property bag keyed by alias.
#[derive(Debug, Clone, Default)]
pub struct Contact {
    pub href: String,
    pub name: String,
    pub etag: Option<String>,
    pub properties: HashMap<String, String>,
}

/// Result of a create-or-update: HTTP-style status plus the fresh etag.
#[derive(Debug, Clone)]
pub struct ItemResult {
    pub status: u16,
    pub etag: Option<String>,
}

/// Typed boolean search condition tree, rendered to Exchange SQL for
/// WebDAV and to a Restriction element for EWS.
#[derive(Debug, Clone)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    EqualTo(&'static str, String),
    /// Substring match.
    Like(&'static str, String),
    StartsWith(&'static str, String),
    GreaterThan(&'static str, String),
    GreaterThanOrEqual(&'static str, String),
    LowerThan(&'static str, String),
    IsTrue(&'static str),
    IsFalse(&'static str),
    IsNull(&'static str),
    Exists(&'static str),
}

fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn sql_operand(alias: &'static str, value: &str) -> String {
    if field::get(alias).is_int_value() {
        value.to_string()
    } else {
        sql_quote(value)
    }
}

impl Condition {
    /// Exchange SQL WHERE clause fragment.
    pub fn to_dav_sql(&self) -> String {
        match self {
            Condition::And(children) => join_sql(children, " AND "),
            Condition::Or(children) => join_sql(children, " OR "),
            Condition::Not(child) => format!("(NOT {})", child.to_dav_sql()),
            Condition::EqualTo(alias, value) => format!(
                "\"{}\" = {}",
                field::get(alias).uri(),
                sql_operand(alias, value)
            ),
            Condition::Like(alias, value) => format!(
                "\"{}\" LIKE {}",
                field::get(alias).uri(),
                sql_quote(&format!("%{}%", value))
            ),
            Condition::StartsWith(alias, value) => format!(
                "\"{}\" LIKE {}",
                field::get(alias).uri(),
                sql_quote(&format!("{}%", value))
            ),
            Condition::GreaterThan(alias, value) => format!(
                "\"{}\" > {}",
                field::get(alias).uri(),
                sql_operand(alias, value)
            ),
            Condition::GreaterThanOrEqual(alias, value) => format!(
                "\"{}\" >= {}",
                field::get(alias).uri(),
                sql_operand(alias, value)
            ),
            Condition::LowerThan(alias, value) => format!(
                "\"{}\" < {}",
                field::get(alias).uri(),
                sql_operand(alias, value)
            ),
            Condition::IsTrue(alias) => format!("\"{}\" = true", field::get(alias).uri()),
            Condition::IsFalse(alias) => format!("\"{}\" = false", field::get(alias).uri()),
            Condition::IsNull(alias) => format!("\"{}\" is null", field::get(alias).uri()),
            Condition::Exists(alias) => format!("\"{}\" is not null", field::get(alias).uri()),
        }
    }

    /// Inner XML of an EWS Restriction element.
    pub fn to_ews_xml(&self) -> String {
        use crate::ews::locator_xml;
        let locator = |alias: &'static str| locator_xml(field::get(alias).ews_locator());
        let comparison = |op: &str, alias: &'static str, value: &str| {
            format!(
                "<t:{op}>{loc}<t:FieldURIOrConstant><t:Constant Value=\"{v}\"/></t:FieldURIOrConstant></t:{op}>",
                op = op,
                loc = locator(alias),
                v = escape(value)
            )
        };
        match self {
            Condition::And(children) => join_ews("And", children),
            Condition::Or(children) => join_ews("Or", children),
            Condition::Not(child) => format!("<t:Not>{}</t:Not>", child.to_ews_xml()),
            Condition::EqualTo(alias, value) => comparison("IsEqualTo", alias, value),
            Condition::Like(alias, value) => format!(
                "<t:Contains ContainmentMode=\"Substring\" ContainmentComparison=\"IgnoreCase\">{}<t:Constant Value=\"{}\"/></t:Contains>",
                locator(alias),
                escape(value)
            ),
            Condition::StartsWith(alias, value) => format!(
                "<t:Contains ContainmentMode=\"Prefixed\" ContainmentComparison=\"IgnoreCase\">{}<t:Constant Value=\"{}\"/></t:Contains>",
                locator(alias),
                escape(value)
            ),
            Condition::GreaterThan(alias, value) => comparison("IsGreaterThan", alias, value),
            Condition::GreaterThanOrEqual(alias, value) => {
                comparison("IsGreaterThanOrEqualTo", alias, value)
            }
            Condition::LowerThan(alias, value) => comparison("IsLessThan", alias, value),
            Condition::IsTrue(alias) => comparison("IsEqualTo", alias, "true"),
            Condition::IsFalse(alias) => comparison("IsEqualTo", alias, "false"),
            Condition::IsNull(alias) => {
                format!("<t:Not><t:Exists>{}</t:Exists></t:Not>", locator(alias))
            }
            Condition::Exists(alias) => format!("<t:Exists>{}</t:Exists>", locator(alias)),
        }
    }
}

fn join_sql(children: &[Condition], separator: &str) -> String {
    let parts: Vec<String> = children.iter().map(|c| c.to_dav_sql()).collect();
    format!("({})", parts.join(separator))
}

fn join_ews(operator: &str, children: &[Condition]) -> String {
    let mut out = format!("<t:{}>", operator);
    for child in children {
        out.push_str(&child.to_ews_xml());
    }
    out.push_str(&format!("</t:{}>", operator));
    out
}

/// The session capability set shared by both wire implementations.
pub trait ExchangeSession {
    /// Canonical mailbox address.
    fn email(&self) -> &str;

    fn get_folder(&mut self, path: &str) -> Result<Folder, GatewayError>;
    fn list_folders(
        &mut self,
        path: &str,
        condition: Option<&Condition>,
        recursive: bool,
    ) -> Result<Vec<Folder>, GatewayError>;
    fn create_folder(&mut self, path: &str, folder_class: &str) -> Result<(), GatewayError>;
    fn delete_folder(&mut self, path: &str) -> Result<(), GatewayError>;
    fn move_folder(&mut self, path: &str, target_path: &str) -> Result<(), GatewayError>;
    /// Reload counts and ctag; true when the folder content changed.
    fn refresh_folder(&mut self, folder: &mut Folder) -> Result<bool, GatewayError>;

    /// Item searches select a fixed per-kind property set; `attributes`
    /// adds caller-chosen aliases on top of it. Extra values land in the
    /// property bag where the item kind carries one.
    fn search_messages(
        &mut self,
        folder_path: &str,
        attributes: &[&str],
        condition: Option<&Condition>,
    ) -> Result<Vec<Message>, GatewayError>;
    fn search_events(
        &mut self,
        folder_path: &str,
        attributes: &[&str],
        condition: Option<&Condition>,
    ) -> Result<Vec<Event>, GatewayError>;
    fn search_contacts(
        &mut self,
        folder_path: &str,
        attributes: &[&str],
        condition: Option<&Condition>,
    ) -> Result<Vec<Contact>, GatewayError>;

    /// Fetch one calendar/contact item by name, with the documented
    /// one-retry failover on a stale permanent URL.
    fn get_item(&mut self, folder_path: &str, name: &str) -> Result<Item, GatewayError>;
    fn get_message_content(&mut self, message: &Message) -> Result<Vec<u8>, GatewayError>;

    fn create_message(
        &mut self,
        folder_path: &str,
        name: &str,
        properties: &[(&'static str, String)],
        mime: &[u8],
    ) -> Result<(), GatewayError>;
    fn update_message(
        &mut self,
        message: &Message,
        properties: &[(&'static str, String)],
    ) -> Result<(), GatewayError>;
    fn create_or_update_event(
        &mut self,
        folder_path: &str,
        name: &str,
        ics: &str,
        etag: Option<&str>,
        none_match: bool,
    ) -> Result<ItemResult, GatewayError>;
    fn create_or_update_contact(
        &mut self,
        folder_path: &str,
        name: &str,
        properties: &[(&'static str, String)],
        etag: Option<&str>,
        none_match: bool,
    ) -> Result<ItemResult, GatewayError>;

    fn move_item(&mut self, source_path: &str, target_path: &str) -> Result<(), GatewayError>;
    fn copy_item(&mut self, source_path: &str, target_path: &str) -> Result<(), GatewayError>;
    /// Soft delete used by mail clients; succeeds when the item is gone.
    fn move_to_trash(&mut self, message: &Message) -> Result<(), GatewayError>;
    /// Idempotent: deleting an item that is already gone succeeds.
    fn delete_item(&mut self, folder_path: &str, name: &str) -> Result<(), GatewayError>;

    /// Queue a message for delivery: draft in Drafts, then moved to the
    /// submission location, which triggers the send.
    fn send_message(&mut self, mime: &[u8]) -> Result<(), GatewayError>;

    /// Cheap probe used to detect a dropped or timed-out session.
    fn is_expired(&mut self) -> bool;
}

/// Default select set plus caller extras, without duplicates.
pub(crate) fn merge_attributes<'a>(defaults: &[&'a str], extras: &[&'a str]) -> Vec<&'a str> {
    let mut aliases: Vec<&str> = defaults.to_vec();
    for extra in extras {
        if !aliases.contains(extra) {
            aliases.push(extra);
        }
    }
    aliases
}

/// Connect and pick the wire implementation by capability probe: mailbox
/// WebDAV access first, EWS endpoint as the fallback.
pub fn connect(
    transport: Arc<dyn HttpTransport>,
    config: SessionConfig,
) -> Result<Box<dyn ExchangeSession>, GatewayError> {
    match dav::DavSession::connect(transport.clone(), config.clone()) {
        Ok(session) => Ok(Box::new(session)),
        Err(GatewayError::AuthFailed(m)) => Err(GatewayError::AuthFailed(m)),
        Err(e) => {
            log::info!("WebDAV unavailable ({}), trying EWS", e);
            Ok(Box::new(ews::EwsSession::connect(transport, config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_string_values_quoted_and_escaped() {
        let c = Condition::EqualTo("subject", "it's here".to_string());
        assert_eq!(
            c.to_dav_sql(),
            "\"urn:schemas:httpmail:subject\" = 'it''s here'"
        );
    }

    #[test]
    fn sql_int_values_unquoted() {
        let c = Condition::GreaterThan("imapUid", "42".to_string());
        assert_eq!(
            c.to_dav_sql(),
            "\"http://schemas.microsoft.com/mapi/proptag/x0e230003\" > 42"
        );
    }

    #[test]
    fn sql_boolean_and_null_forms() {
        assert_eq!(
            Condition::IsTrue("isfolder").to_dav_sql(),
            "\"DAV:isfolder\" = true"
        );
        assert_eq!(
            Condition::IsNull("instancetype").to_dav_sql(),
            "\"urn:schemas:calendar:instancetype\" is null"
        );
        assert_eq!(
            Condition::Exists("dtstart").to_dav_sql(),
            "\"urn:schemas:calendar:dtstart\" is not null"
        );
    }

    #[test]
    fn sql_nested_tree() {
        let c = Condition::And(vec![
            Condition::IsFalse("isfolder"),
            Condition::Not(Box::new(Condition::IsNull("instancetype"))),
        ]);
        assert_eq!(
            c.to_dav_sql(),
            "(\"DAV:isfolder\" = false AND (NOT \"urn:schemas:calendar:instancetype\" is null))"
        );
    }

    #[test]
    fn ews_restriction_tree() {
        let c = Condition::And(vec![
            Condition::EqualTo("urlcompname", "x.EML".to_string()),
            Condition::IsTrue("read"),
        ]);
        let xml = c.to_ews_xml();
        assert!(xml.starts_with("<t:And>"));
        assert!(xml.contains("<t:IsEqualTo>"));
        assert!(xml.contains("<t:Constant Value=\"x.EML\"/>"));
        assert!(xml.contains("message:IsRead"));
    }

    #[test]
    fn ews_contains_modes() {
        assert!(Condition::Like("subject", "x".to_string())
            .to_ews_xml()
            .contains("ContainmentMode=\"Substring\""));
        assert!(Condition::StartsWith("subject", "x".to_string())
            .to_ews_xml()
            .contains("ContainmentMode=\"Prefixed\""));
    }
}
