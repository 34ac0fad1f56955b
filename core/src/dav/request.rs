/*
 * request.rs
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

//! WebDAV request body generation.
//!
//! Bodies declare only the namespaces actually referenced: one single-letter
//! prefix is allocated per distinct namespace URI, starting at `e`, with `D`
//! reserved for `DAV:`. Exchange rejects some requests with large boilerplate
//! namespace blocks, and short prefixes keep bodies small.

use quick_xml::escape::escape;

use crate::error::GatewayError;
use crate::field::{self, Field};

const TYPE_NS: &str = "urn:schemas-microsoft-com:datatypes";

/// Allocates one prefix per namespace URI for a single request body.
pub struct NamespacePrefixes {
    entries: Vec<(String, String)>,
    next: char,
}

impl Default for NamespacePrefixes {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespacePrefixes {
    pub fn new() -> Self {
        Self {
            entries: vec![(field::DAV_NS.to_string(), "D".to_string())],
            next: 'e',
        }
    }

    /// Prefix for a namespace, allocating on first use.
    pub fn prefix(&mut self, namespace: &str) -> String {
        if let Some((_, p)) = self.entries.iter().find(|(ns, _)| ns == namespace) {
            return p.clone();
        }
        let prefix = self.next.to_string();
        self.next = (self.next as u8 + 1) as char;
        self.entries.push((namespace.to_string(), prefix.clone()));
        prefix
    }

    /// xmlns declarations for every allocated prefix, in allocation order.
    pub fn declarations(&self) -> String {
        let mut out = String::new();
        for (ns, prefix) in &self.entries {
            out.push_str(&format!(" xmlns:{}=\"{}\"", prefix, ns));
        }
        out
    }
}

/// PROPFIND body requesting the given aliases.
pub fn build_propfind(aliases: &[&str]) -> Vec<u8> {
    let mut prefixes = NamespacePrefixes::new();
    let mut props = String::new();
    for alias in aliases {
        let f = field::get(alias);
        let prefix = prefixes.prefix(&f.namespace);
        props.push_str(&format!("<{}:{}/>", prefix, f.name));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <D:propfind{}><D:prop>{}</D:prop></D:propfind>",
        prefixes.declarations(),
        props
    )
    .into_bytes()
}

fn dt_attribute(f: &Field) -> &'static str {
    if f.is_int_value() {
        " T:dt=\"int\""
    } else if f.is_boolean_value() {
        " T:dt=\"boolean\""
    } else if f.is_multivalued() {
        " T:dt=\"mv.string\""
    } else {
        ""
    }
}

/// PROPPATCH body with typed set values and removals.
pub fn build_proppatch(
    set: &[(&str, &str)],
    remove: &[&str],
) -> Result<Vec<u8>, GatewayError> {
    let mut prefixes = NamespacePrefixes::new();
    let mut set_block = String::new();
    for (alias, value) in set {
        let f = field::get(alias);
        let prefix = prefixes.prefix(&f.namespace);
        let wire_value: String = if f.is_boolean_value() {
            match *value {
                "true" => "1".to_string(),
                "false" => "0".to_string(),
                other => {
                    return Err(GatewayError::malformed(format!(
                        "invalid boolean for {}: {}",
                        alias, other
                    )))
                }
            }
        } else {
            value.to_string()
        };
        if f.is_multivalued() {
            let mut items = String::new();
            for single in wire_value.split('\n') {
                items.push_str(&format!("<v xmlns=\"xml:\">{}</v>", escape(single)));
            }
            set_block.push_str(&format!(
                "<{p}:{n}{dt}>{items}</{p}:{n}>",
                p = prefix,
                n = f.update_name(),
                dt = dt_attribute(f),
                items = items
            ));
        } else {
            set_block.push_str(&format!(
                "<{p}:{n}{dt}>{v}</{p}:{n}>",
                p = prefix,
                n = f.update_name(),
                dt = dt_attribute(f),
                v = escape(&wire_value)
            ));
        }
    }
    let mut remove_block = String::new();
    for alias in remove {
        let f = field::get(alias);
        let prefix = prefixes.prefix(&f.namespace);
        remove_block.push_str(&format!("<{}:{}/>", prefix, f.update_name()));
    }
    let mut body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <D:propertyupdate{} xmlns:T=\"{}\">",
        prefixes.declarations(),
        TYPE_NS
    );
    if !set_block.is_empty() {
        body.push_str(&format!("<D:set><D:prop>{}</D:prop></D:set>", set_block));
    }
    if !remove_block.is_empty() {
        body.push_str(&format!(
            "<D:remove><D:prop>{}</D:prop></D:remove>",
            remove_block
        ));
    }
    body.push_str("</D:propertyupdate>");
    Ok(body.into_bytes())
}

/// Traversal mode for SEARCH scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Shallow,
    Deep,
}

impl Traversal {
    fn keyword(self) -> &'static str {
        match self {
            Traversal::Shallow => "SHALLOW",
            Traversal::Deep => "DEEP",
        }
    }
}

/// SEARCH body: Exchange SQL over the given scope. The WHERE clause is
/// rendered by the caller from a condition tree.
pub fn build_search(
    select_aliases: &[&str],
    scope_path: &str,
    traversal: Traversal,
    where_clause: Option<&str>,
) -> Vec<u8> {
    let mut select = String::new();
    for (i, alias) in select_aliases.iter().enumerate() {
        if i > 0 {
            select.push(',');
        }
        select.push_str(&field::get(alias).request_property_string());
    }
    let mut sql = format!(
        "SELECT {} FROM Scope('{} TRAVERSAL OF \"{}\"')",
        select,
        traversal.keyword(),
        scope_path
    );
    if let Some(clause) = where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <searchrequest xmlns=\"DAV:\"><sql>{}</sql></searchrequest>",
        escape(&sql)
    )
    .into_bytes()
}

/// MKCOL is sent with a PROPPATCH-shaped body setting the folder class.
pub fn build_mkcol(folder_class: &str) -> Result<Vec<u8>, GatewayError> {
    build_proppatch(&[("folderclass", folder_class)], &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dav_prefix_reserved() {
        let mut p = NamespacePrefixes::new();
        assert_eq!(p.prefix("DAV:"), "D");
        assert_eq!(p.prefix("urn:schemas:httpmail:"), "e");
        assert_eq!(p.prefix("urn:schemas:mailheader:"), "f");
        // repeated lookup reuses the prefix
        assert_eq!(p.prefix("urn:schemas:httpmail:"), "e");
    }

    #[test]
    fn propfind_references_only_needed_namespaces() {
        let body = String::from_utf8(build_propfind(&["displayname", "subject"])).unwrap();
        assert!(body.contains("xmlns:D=\"DAV:\""));
        assert!(body.contains("xmlns:e=\"urn:schemas:httpmail:\""));
        assert!(body.contains("<D:displayname/>"));
        assert!(body.contains("<e:subject/>"));
        assert!(!body.contains("mailheader"));
    }

    #[test]
    fn proppatch_types_and_boolean_coercion() {
        let body = String::from_utf8(
            build_proppatch(&[("read", "true"), ("imapUid", "42")], &[]).unwrap(),
        )
        .unwrap();
        // WebDAV booleans go on the wire as 1/0
        assert!(body.contains(">1</"));
        assert!(body.contains("T:dt=\"int\""));
        assert!(body.contains("urn:schemas-microsoft-com:datatypes"));
    }

    #[test]
    fn proppatch_rejects_invalid_boolean() {
        assert!(build_proppatch(&[("read", "yes")], &[]).is_err());
    }

    #[test]
    fn proppatch_set_uses_update_alias() {
        let body =
            String::from_utf8(build_proppatch(&[("email1", "a@b.net")], &[]).unwrap()).unwrap();
        assert!(body.contains("_x0030_x8084"));
    }

    #[test]
    fn proppatch_remove_block() {
        let body = String::from_utf8(build_proppatch(&[], &["subject"]).unwrap()).unwrap();
        assert!(body.contains("<D:remove>"));
        assert!(!body.contains("<D:set>"));
    }

    #[test]
    fn multivalued_splits_on_newline() {
        let body = String::from_utf8(
            build_proppatch(&[("keywords", "red\ngreen")], &[]).unwrap(),
        )
        .unwrap();
        assert!(body.contains("<v xmlns=\"xml:\">red</v><v xmlns=\"xml:\">green</v>"));
        assert!(body.contains("T:dt=\"mv.string\""));
    }

    #[test]
    fn search_sql_shape() {
        let body = String::from_utf8(build_search(
            &["etag", "urlcompname"],
            "/exchange/user/Inbox/",
            Traversal::Shallow,
            Some("\"DAV:isfolder\" = false"),
        ))
        .unwrap();
        assert!(body.contains("<searchrequest xmlns=\"DAV:\">"));
        assert!(body.contains("SELECT &quot;DAV:getetag&quot;"));
        assert!(body.contains("SHALLOW TRAVERSAL OF"));
        assert!(body.contains("WHERE"));
    }
}
