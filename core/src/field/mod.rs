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

//! MAPI field mapping.
//!
//! One process-wide table maps logical aliases ("subject", "dtstart",
//! "imapUid"...) to their WebDAV property URI and, where the EWS transport
//! addresses the same property, an EWS field locator. The table is built
//! once on first use and never mutated. Looking up an alias that is not in
//! the table panics: that is a bug in this crate, not a runtime condition.

pub mod values;

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DAV_NS: &str = "DAV:";
pub const HTTPMAIL_NS: &str = "urn:schemas:httpmail:";
pub const MAILHEADER_NS: &str = "urn:schemas:mailheader:";
pub const EXCHANGE_NS: &str = "http://schemas.microsoft.com/exchange/";
pub const MAPI_NS: &str = "http://schemas.microsoft.com/mapi/";
pub const MAPI_PROPTAG_NS: &str = "http://schemas.microsoft.com/mapi/proptag/";
pub const MAPI_ID_NS: &str = "http://schemas.microsoft.com/mapi/id/";
pub const MAPI_STRING_NS: &str = "http://schemas.microsoft.com/mapi/string/";
pub const REPL_NS: &str = "http://schemas.microsoft.com/repl/";
pub const CONTACTS_NS: &str = "urn:schemas:contacts:";
pub const CALENDAR_NS: &str = "urn:schemas:calendar:";

/// GUID-identified property sets for extended MAPI properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertySet {
    Meeting,
    Appointment,
    Common,
    PublicStrings,
    Address,
    InternetHeaders,
    UnifiedMessaging,
    Task,
}

impl PropertySet {
    pub fn guid(self) -> &'static str {
        match self {
            PropertySet::Meeting => "6ed8da90-450b-101b-98da-00aa003f1305",
            PropertySet::Appointment => "00062002-0000-0000-c000-000000000046",
            PropertySet::Common => "00062008-0000-0000-c000-000000000046",
            PropertySet::PublicStrings => "00020329-0000-0000-c000-000000000046",
            PropertySet::Address => "00062004-0000-0000-c000-000000000046",
            PropertySet::InternetHeaders => "00020386-0000-0000-c000-000000000046",
            PropertySet::UnifiedMessaging => "4442858e-a9e3-4e80-b900-317a210cc15b",
            PropertySet::Task => "00062003-0000-0000-c000-000000000046",
        }
    }

    /// EWS DistinguishedPropertySetId attribute value.
    pub fn ews_name(self) -> &'static str {
        match self {
            PropertySet::Meeting => "Meeting",
            PropertySet::Appointment => "Appointment",
            PropertySet::Common => "Common",
            PropertySet::PublicStrings => "PublicStrings",
            PropertySet::Address => "Address",
            PropertySet::InternetHeaders => "InternetHeaders",
            PropertySet::UnifiedMessaging => "UnifiedMessaging",
            PropertySet::Task => "Task",
        }
    }
}

/// MAPI primitive types used by this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Integer,
    Long,
    Boolean,
    SystemTime,
    String,
    Binary,
    StringArray,
}

impl PropertyType {
    /// Hex type code appended to proptag-coded names. 001f is PT_UNICODE.
    pub fn mapi_hex(self) -> &'static str {
        match self {
            PropertyType::Integer | PropertyType::Long => "0003",
            PropertyType::Boolean => "000b",
            PropertyType::SystemTime => "0040",
            PropertyType::String => "001f",
            PropertyType::Binary => "0102",
            PropertyType::StringArray => "101f",
        }
    }

    /// EWS PropertyType attribute value.
    pub fn ews_name(self) -> &'static str {
        match self {
            PropertyType::Integer => "Integer",
            PropertyType::Long => "Long",
            PropertyType::Boolean => "Boolean",
            PropertyType::SystemTime => "SystemTime",
            PropertyType::String => "String",
            PropertyType::Binary => "Binary",
            PropertyType::StringArray => "StringArray",
        }
    }
}

/// EWS rendering of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EwsLocator {
    /// t:FieldURI with a fixed constant like "calendar:Start".
    FieldUri(&'static str),
    /// t:IndexedFieldURI, for multi-slot properties like email addresses.
    IndexedFieldUri {
        uri: &'static str,
        index: &'static str,
    },
    /// t:ExtendedFieldURI addressed by property tag.
    ExtendedTag { tag: u32, ptype: PropertyType },
    /// t:ExtendedFieldURI addressed by property set GUID + numeric id.
    ExtendedSetId {
        set: PropertySet,
        id: u32,
        ptype: PropertyType,
    },
    /// t:ExtendedFieldURI addressed by property set GUID + property name.
    ExtendedSetName { set: PropertySet, name: &'static str },
}

/// One alias entry: the WebDAV property plus optional EWS locator.
#[derive(Debug, Clone)]
pub struct Field {
    pub alias: &'static str,
    pub namespace: String,
    pub name: String,
    /// PROPPATCH name when it differs from the PROPFIND name.
    update_name: String,
    /// SEARCH response column when the request uses `as alias`.
    response_alias: Option<&'static str>,
    /// Response cast attribute, e.g. bin.base64 for binary proptags.
    pub cast: Option<&'static str>,
    pub ptype: Option<PropertyType>,
    ews: Option<EwsLocator>,
}

impl Field {
    /// Full WebDAV property URI.
    pub fn uri(&self) -> String {
        format!("{}{}", self.namespace, self.name)
    }

    /// Property reference in SEARCH request SELECT clauses.
    pub fn request_property_string(&self) -> String {
        match self.response_alias {
            Some(alias) => format!("\"{}\" as {}", self.uri(), alias),
            None => format!("\"{}\"", self.uri()),
        }
    }

    /// Column name carrying this field in a SEARCH response.
    pub fn response_name(&self) -> &str {
        self.response_alias.unwrap_or(&self.name)
    }

    /// Property name used in PROPPATCH bodies.
    pub fn update_name(&self) -> &str {
        &self.update_name
    }

    pub fn is_int_value(&self) -> bool {
        matches!(
            self.ptype,
            Some(PropertyType::Integer) | Some(PropertyType::Long)
        )
    }

    pub fn is_boolean_value(&self) -> bool {
        self.ptype == Some(PropertyType::Boolean)
    }

    pub fn is_multivalued(&self) -> bool {
        self.ptype == Some(PropertyType::StringArray)
    }

    /// EWS locator; panics when the alias is not addressable over EWS.
    pub fn ews_locator(&self) -> &EwsLocator {
        match &self.ews {
            Some(locator) => locator,
            None => panic!("no EWS locator for field: {}", self.alias),
        }
    }

    fn namespaced(alias: &'static str, namespace: &str, name: &str) -> Self {
        Field {
            alias,
            namespace: namespace.to_string(),
            name: name.to_string(),
            update_name: name.to_string(),
            response_alias: None,
            cast: None,
            ptype: None,
            ews: None,
        }
    }

    /// Proptag-coded name: `x` + 4-hex tag + 4-hex type under mapi/proptag/.
    fn tagged(alias: &'static str, tag: u32, ptype: PropertyType) -> Self {
        let name = format!("x{:04x}{}", tag, ptype.mapi_hex());
        let cast = if ptype == PropertyType::Binary {
            Some("bin.base64")
        } else {
            None
        };
        let response_alias = if cast.is_some() { Some(alias) } else { None };
        Field {
            alias,
            namespace: MAPI_PROPTAG_NS.to_string(),
            name: name.clone(),
            update_name: name,
            response_alias,
            cast,
            ptype: Some(ptype),
            ews: None,
        }
    }

    /// GUID-set property. The Address set expects decimal names, the others
    /// hex names; PROPPATCH uses the escaped alias form.
    fn in_set(
        alias: &'static str,
        set: PropertySet,
        id: u32,
        response_alias: &'static str,
        ptype: PropertyType,
    ) -> Self {
        let name = if set == PropertySet::Address {
            format!("{}", id)
        } else {
            format!("0x{:04x}", id)
        };
        Field {
            alias,
            namespace: format!("{}{{{}}}/", MAPI_ID_NS, set.guid()),
            name,
            update_name: format!("_x0030_x{:04x}", id),
            response_alias: Some(response_alias),
            cast: None,
            ptype: Some(ptype),
            ews: None,
        }
    }

    fn ews_uri(mut self, uri: &'static str) -> Self {
        self.ews = Some(EwsLocator::FieldUri(uri));
        self
    }

    fn ews_indexed(mut self, uri: &'static str, index: &'static str) -> Self {
        self.ews = Some(EwsLocator::IndexedFieldUri { uri, index });
        self
    }

    fn ews_tag(mut self, tag: u32, ptype: PropertyType) -> Self {
        self.ews = Some(EwsLocator::ExtendedTag { tag, ptype });
        self
    }

    fn ews_set_id(mut self, set: PropertySet, id: u32, ptype: PropertyType) -> Self {
        self.ews = Some(EwsLocator::ExtendedSetId { set, id, ptype });
        self
    }

    fn ews_set_name(mut self, set: PropertySet, name: &'static str) -> Self {
        self.ews = Some(EwsLocator::ExtendedSetName { set, name });
        self
    }
}

fn build_field_map() -> HashMap<&'static str, Field> {
    use PropertySet::*;
    use PropertyType::*;

    let mut map = HashMap::new();
    let mut add = |field: Field| {
        map.insert(field.alias, field);
    };

    // well known folders
    for name in [
        "inbox",
        "deleteditems",
        "sentitems",
        "sendmsg",
        "drafts",
        "calendar",
        "contacts",
        "outbox",
    ] {
        add(Field::namespaced(name, HTTPMAIL_NS, name));
    }

    // folder
    add(Field::namespaced("folderclass", EXCHANGE_NS, "outlookfolderclass").ews_tag(0x3613, String));
    add(Field::namespaced("hassubs", DAV_NS, "hassubs").ews_tag(0x360a, Boolean));
    add(Field::namespaced("nosubs", DAV_NS, "nosubs"));
    add(Field::namespaced("unreadcount", HTTPMAIL_NS, "unreadcount").ews_tag(0x3603, Integer));
    add(Field::namespaced("contenttag", REPL_NS, "contenttag").ews_tag(0x670a, SystemTime));
    add(Field::namespaced("isfolder", DAV_NS, "isfolder"));
    add(Field::namespaced("ishidden", DAV_NS, "ishidden"));
    add(Field::namespaced("displayname", DAV_NS, "displayname").ews_tag(0x3001, String));
    add(Field::namespaced("folderDisplayName", DAV_NS, "displayname").ews_uri("folder:DisplayName"));
    add(Field::tagged("uidNext", 0x6751, Integer));

    // item uid based on PR_RECORD_KEY, not usable as a search key
    add(Field::namespaced("uid", DAV_NS, "uid").ews_tag(0x0ff9, Binary));

    // POP and IMAP message
    add(Field::tagged("messageSize", 0x0e08, Long).ews_tag(0x0e08, Integer));
    add(Field::tagged("imapUid", 0x0e23, Long).ews_tag(0x0e23, Integer));
    add(Field::tagged("junk", 0x1083, Long).ews_tag(0x1083, Long));
    add(Field::tagged("flagStatus", 0x1090, Long).ews_tag(0x1090, Integer));
    add(Field::tagged("messageFlags", 0x0e07, Long).ews_tag(0x0e07, Integer));
    add(Field::tagged("lastVerbExecuted", 0x1081, Long).ews_tag(0x1081, Integer));
    add(Field::tagged("iconIndex", 0x1080, Long).ews_tag(0x1080, Integer));
    add(Field::namespaced("read", HTTPMAIL_NS, "read").ews_uri("message:IsRead"));
    add(Field::in_set("deleted", Common, 0x8570, "deleted", String).ews_set_id(Common, 0x8570, String));
    add(Field::tagged("date", 0x0e06, SystemTime).ews_tag(0x0e06, SystemTime));
    add(Field::namespaced("datereceived", HTTPMAIL_NS, "datereceived").ews_tag(0x0e06, SystemTime));
    add(Field::namespaced("bcc", MAILHEADER_NS, "bcc").ews_set_name(InternetHeaders, "bcc"));

    // search
    add(Field::namespaced("subject", HTTPMAIL_NS, "subject").ews_tag(0x0037, String));
    add(Field::tagged("body", 0x1000, String).ews_uri("item:Body"));
    add(Field::namespaced("from", HTTPMAIL_NS, "from").ews_uri("message:From"));
    add(Field::namespaced("to", MAILHEADER_NS, "to").ews_set_name(InternetHeaders, "to"));
    add(Field::namespaced("cc", MAILHEADER_NS, "cc").ews_set_name(InternetHeaders, "cc"));
    add(Field::namespaced("lastmodified", DAV_NS, "getlastmodified").ews_tag(0x3008, SystemTime));

    // failover search
    add(Field::tagged("urlcompname", 0x10f3, String).ews_tag(0x10f3, String));

    // items
    add(Field::namespaced("etag", DAV_NS, "getetag").ews_tag(0x3008, SystemTime));

    // calendar
    add(Field::namespaced("permanenturl", EXCHANGE_NS, "permanenturl").ews_tag(0x670e, String));
    add(Field::namespaced("instancetype", CALENDAR_NS, "instancetype")
        .ews_set_name(PublicStrings, "urn:schemas:calendar:instancetype"));
    add(Field::namespaced("dtstart", CALENDAR_NS, "dtstart").ews_tag(0x10c3, SystemTime));
    add(Field::namespaced("dtend", CALENDAR_NS, "dtend").ews_tag(0x10c4, SystemTime));
    add(Field::namespaced("timezoneid", CALENDAR_NS, "timezoneid"));
    add(Field::tagged("processed", 0x65e8, Boolean));
    add(Field::namespaced("contentclass", DAV_NS, "contentclass").ews_uri("item:ItemClass"));
    add(Field::tagged("internetContent", 0x6659, Binary));
    add(Field::tagged("sensitivity", 0x0036, Long).ews_uri("item:Sensitivity"));
    add(Field::namespaced("outlookmessageclass", EXCHANGE_NS, "outlookmessageclass").ews_tag(0x001a, String));
    add(Field::tagged("messageclass", 0x001a, String).ews_tag(0x001a, String));

    // contact
    add(Field::namespaced("middlename", CONTACTS_NS, "middlename").ews_tag(0x3a44, String));
    add(Field::namespaced("fileas", CONTACTS_NS, "fileas")
        .ews_set_name(PublicStrings, "urn:schemas:contacts:fileas"));
    add(Field::namespaced("homepostaladdress", CONTACTS_NS, "homepostaladdress")
        .ews_set_id(Address, 0x801a, String));
    add(Field::namespaced("otherpostaladdress", CONTACTS_NS, "otherpostaladdress")
        .ews_set_id(Address, 0x801c, String));
    add(Field::namespaced("mailingaddressid", CONTACTS_NS, "mailingaddressid")
        .ews_set_id(Address, 0x8022, String));
    add(Field::namespaced("workaddress", CONTACTS_NS, "workaddress")
        .ews_set_id(Address, 0x801b, String));
    add(Field::namespaced("alternaterecipient", CONTACTS_NS, "alternaterecipient")
        .ews_set_name(PublicStrings, "urn:schemas:contacts:alternaterecipient"));
    add(Field::namespaced("extensionattribute1", EXCHANGE_NS, "extensionattribute1")
        .ews_set_id(Address, 0x804f, String));
    add(Field::namespaced("extensionattribute2", EXCHANGE_NS, "extensionattribute2")
        .ews_set_id(Address, 0x8050, String));
    add(Field::namespaced("extensionattribute3", EXCHANGE_NS, "extensionattribute3")
        .ews_set_id(Address, 0x8051, String));
    add(Field::namespaced("extensionattribute4", EXCHANGE_NS, "extensionattribute4")
        .ews_set_id(Address, 0x8052, String));
    add(Field::namespaced("bday", CONTACTS_NS, "bday").ews_tag(0x3a42, SystemTime));
    add(Field::namespaced("anniversary", CONTACTS_NS, "weddinganniversary").ews_tag(0x3a41, SystemTime));
    add(Field::namespaced("businesshomepage", CONTACTS_NS, "businesshomepage").ews_tag(0x3a51, String));
    add(Field::namespaced("personalHomePage", CONTACTS_NS, "personalHomePage").ews_tag(0x3a50, String));
    add(Field::namespaced("cn", CONTACTS_NS, "cn").ews_tag(0x3001, String));
    add(Field::namespaced("co", CONTACTS_NS, "co").ews_set_id(Address, 0x8049, String));
    add(Field::namespaced("department", CONTACTS_NS, "department").ews_tag(0x3a18, String));
    // email with display name
    add(Field::namespaced("writeemail1", CONTACTS_NS, "email1")
        .ews_indexed("contacts:EmailAddress", "EmailAddress1"));
    add(Field::namespaced("writeemail2", CONTACTS_NS, "email2")
        .ews_indexed("contacts:EmailAddress", "EmailAddress2"));
    add(Field::namespaced("writeemail3", CONTACTS_NS, "email3")
        .ews_indexed("contacts:EmailAddress", "EmailAddress3"));
    // email only
    add(Field::in_set("email1", Address, 0x8084, "email1", String)
        .ews_set_id(Address, 0x8084, String));
    add(Field::in_set("email2", Address, 0x8094, "email2", String)
        .ews_set_id(Address, 0x8094, String));
    add(Field::in_set("email3", Address, 0x80a4, "email3", String)
        .ews_set_id(Address, 0x80a4, String));
    add(Field::namespaced("facsimiletelephonenumber", CONTACTS_NS, "facsimiletelephonenumber")
        .ews_tag(0x3a24, String));
    add(Field::namespaced("givenName", CONTACTS_NS, "givenName").ews_tag(0x3a06, String));
    add(Field::namespaced("homepostofficebox", CONTACTS_NS, "homepostofficebox").ews_tag(0x3a5e, String));
    add(Field::namespaced("homeCity", CONTACTS_NS, "homeCity").ews_tag(0x3a59, String));
    add(Field::namespaced("homeCountry", CONTACTS_NS, "homeCountry").ews_tag(0x3a5a, String));
    add(Field::namespaced("homePhone", CONTACTS_NS, "homePhone").ews_tag(0x3a09, String));
    add(Field::namespaced("homePostalCode", CONTACTS_NS, "homePostalCode").ews_tag(0x3a5b, String));
    add(Field::namespaced("homeState", CONTACTS_NS, "homeState").ews_tag(0x3a5c, String));
    add(Field::namespaced("homeStreet", CONTACTS_NS, "homeStreet").ews_tag(0x3a5d, String));
    add(Field::namespaced("l", CONTACTS_NS, "l").ews_set_id(Address, 0x8046, String));
    add(Field::namespaced("manager", CONTACTS_NS, "manager").ews_tag(0x3a4e, String));
    add(Field::namespaced("mobile", CONTACTS_NS, "mobile").ews_tag(0x3a1c, String));
    add(Field::namespaced("namesuffix", CONTACTS_NS, "namesuffix").ews_tag(0x3a05, String));
    add(Field::namespaced("nickname", CONTACTS_NS, "nickname").ews_tag(0x3a4f, String));
    add(Field::namespaced("o", CONTACTS_NS, "o").ews_tag(0x3a16, String));
    add(Field::namespaced("pager", CONTACTS_NS, "pager").ews_tag(0x3a21, String));
    add(Field::namespaced("personaltitle", CONTACTS_NS, "personaltitle").ews_tag(0x3a45, String));
    add(Field::namespaced("postalcode", CONTACTS_NS, "postalcode").ews_set_id(Address, 0x8048, String));
    add(Field::namespaced("postofficebox", CONTACTS_NS, "postofficebox")
        .ews_set_id(Address, 0x804a, String));
    add(Field::namespaced("profession", CONTACTS_NS, "profession").ews_tag(0x3a46, String));
    add(Field::namespaced("roomnumber", CONTACTS_NS, "roomnumber").ews_tag(0x3a19, String));
    add(Field::namespaced("secretarycn", CONTACTS_NS, "secretarycn").ews_tag(0x3a30, String));
    add(Field::namespaced("sn", CONTACTS_NS, "sn").ews_tag(0x3a11, String));
    add(Field::namespaced("spousecn", CONTACTS_NS, "spousecn").ews_tag(0x3a48, String));
    add(Field::namespaced("st", CONTACTS_NS, "st").ews_set_id(Address, 0x8047, String));
    add(Field::namespaced("street", CONTACTS_NS, "street").ews_set_id(Address, 0x8045, String));
    add(Field::namespaced("telephoneNumber", CONTACTS_NS, "telephoneNumber").ews_tag(0x3a08, String));
    add(Field::namespaced("title", CONTACTS_NS, "title").ews_tag(0x3a17, String));
    add(Field::namespaced("description", HTTPMAIL_NS, "textdescription").ews_tag(0x1000, String));
    add(Field::namespaced("im", MAPI_NS, "InstMsg").ews_set_id(Address, 0x8062, String));
    add(Field::namespaced("othermobile", CONTACTS_NS, "othermobile").ews_tag(0x3a1e, String));
    add(Field::namespaced("otherstreet", CONTACTS_NS, "otherstreet").ews_tag(0x3a63, String));
    add(Field::namespaced("otherstate", CONTACTS_NS, "otherstate").ews_tag(0x3a62, String));
    add(Field::namespaced("otherpostofficebox", CONTACTS_NS, "otherpostofficebox").ews_tag(0x3a64, String));
    add(Field::namespaced("otherpostalcode", CONTACTS_NS, "otherpostalcode").ews_tag(0x3a61, String));
    add(Field::namespaced("othercountry", CONTACTS_NS, "othercountry").ews_tag(0x3a60, String));
    add(Field::namespaced("othercity", CONTACTS_NS, "othercity").ews_tag(0x3a5f, String));
    add(Field::namespaced("gender", CONTACTS_NS, "gender").ews_tag(0x3a4d, Integer));
    {
        let mut keywords = Field::namespaced("keywords", EXCHANGE_NS, "keywords-utf8")
            .ews_set_name(PublicStrings, "Keywords");
        keywords.ptype = Some(StringArray);
        add(keywords);
    }
    add(Field::in_set("private", Common, 0x8506, "private", Boolean)
        .ews_set_id(Common, 0x8506, Boolean));
    add(Field::in_set("haspicture", Address, 0x8015, "haspicture", Boolean)
        .ews_set_id(Address, 0x8015, Boolean));
    add(Field::tagged("attachmentContactPhoto", 0x7fff, Boolean));
    add(Field::tagged("renderingPosition", 0x370b, Long));

    // OWA roaming settings
    add(Field::tagged("roamingxmlstream", 0x7c08, Binary));
    add(Field::tagged("roamingdictionary", 0x7c07, Binary));

    map
}

static FIELD_MAP: OnceLock<HashMap<&'static str, Field>> = OnceLock::new();

/// Look up a field by alias. Panics on an unknown alias: the table is a
/// compile-time artifact and a miss is a programming error.
pub fn get(alias: &str) -> &'static Field {
    let map = FIELD_MAP.get_or_init(build_field_map);
    match map.get(alias) {
        Some(field) => field,
        None => panic!("unknown field: {}", alias),
    }
}

/// Field addressing an arbitrary MIME header through the InternetHeaders
/// property set string namespace.
pub fn header(header_name: &str) -> Field {
    Field {
        alias: "header",
        namespace: format!("{}{{{}}}/", MAPI_STRING_NS, PropertySet::InternetHeaders.guid()),
        name: header_name.to_string(),
        update_name: header_name.to_string(),
        response_alias: None,
        cast: None,
        ptype: Some(PropertyType::String),
        ews: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proptag_name_encodes_tag_and_type() {
        let f = get("imapUid");
        assert_eq!(f.name, "x0e230003");
        assert_eq!(f.namespace, MAPI_PROPTAG_NS);
        assert!(f.is_int_value());
    }

    #[test]
    fn binary_proptag_gets_cast_and_response_alias() {
        let f = get("internetContent");
        assert_eq!(f.cast, Some("bin.base64"));
        assert_eq!(f.response_name(), "internetContent");
        assert_eq!(
            f.request_property_string(),
            "\"http://schemas.microsoft.com/mapi/proptag/x66590102\" as internetContent"
        );
    }

    #[test]
    fn address_set_uses_decimal_names() {
        let f = get("email1");
        assert_eq!(f.name, "32900"); // 0x8084
        assert!(f.namespace.contains("00062004-0000-0000-c000-000000000046"));
        assert_eq!(f.update_name(), "_x0030_x8084");
    }

    #[test]
    fn common_set_uses_hex_names() {
        let f = get("private");
        assert_eq!(f.name, "0x8506");
        assert!(f.namespace.contains("00062008-0000-0000-c000-000000000046"));
    }

    #[test]
    fn namespaced_field_round_trips_uri() {
        let f = get("subject");
        assert_eq!(f.uri(), "urn:schemas:httpmail:subject");
        assert_eq!(f.request_property_string(), "\"urn:schemas:httpmail:subject\"");
    }

    #[test]
    fn header_field_lives_in_internet_headers_set() {
        let f = header("X-Custom");
        assert_eq!(
            f.namespace,
            "http://schemas.microsoft.com/mapi/string/{00020386-0000-0000-c000-000000000046}/"
        );
        assert_eq!(f.name, "X-Custom");
    }

    #[test]
    fn ews_locator_kinds() {
        assert_eq!(get("read").ews_locator(), &EwsLocator::FieldUri("message:IsRead"));
        assert_eq!(
            get("writeemail1").ews_locator(),
            &EwsLocator::IndexedFieldUri {
                uri: "contacts:EmailAddress",
                index: "EmailAddress1"
            }
        );
        assert!(matches!(
            get("imapUid").ews_locator(),
            EwsLocator::ExtendedTag { tag: 0x0e23, .. }
        ));
    }

    #[test]
    #[should_panic(expected = "unknown field")]
    fn unknown_alias_fails_fast() {
        get("nonexistent");
    }

    #[test]
    fn session_aliases_all_mapped() {
        // every alias the session and condition code references
        for alias in [
            "inbox",
            "deleteditems",
            "sentitems",
            "sendmsg",
            "drafts",
            "calendar",
            "contacts",
            "outbox",
            "folderclass",
            "hassubs",
            "nosubs",
            "unreadcount",
            "contenttag",
            "isfolder",
            "displayname",
            "urlcompname",
            "etag",
            "permanenturl",
            "uid",
            "imapUid",
            "messageSize",
            "junk",
            "flagStatus",
            "messageFlags",
            "lastVerbExecuted",
            "iconIndex",
            "read",
            "deleted",
            "date",
            "subject",
            "body",
            "from",
            "to",
            "cc",
            "bcc",
            "lastmodified",
            "instancetype",
            "dtstart",
            "dtend",
            "contentclass",
            "internetContent",
            "outlookmessageclass",
            "messageclass",
            "sensitivity",
        ] {
            let _ = get(alias);
        }
    }
}
