/*
 * auth.rs
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

//! OWA authentication: basic-auth detection, forms-based logon, and
//! mailbox path resolution from the post-login page.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::error::GatewayError;
use crate::http::{HttpRequest, HttpTransport};

use super::SessionConfig;

/// Input names OWA variants use for the account field.
const USER_NAME_FIELDS: &[&str] = &[
    "username",
    "txtUserName",
    "userid",
    "SafeWordUser",
    "user_name",
    "login",
    "user",
];

/// Input names OWA variants use for the password field.
const PASSWORD_FIELDS: &[&str] = &[
    "password",
    "txtUserPass",
    "pw",
    "basicPassword",
    "passwd",
    "Password",
];

/// What the server told us after authentication.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Root of the authenticated mailbox, absolute path on the server.
    pub mail_path: String,
    /// Mailbox alias, last segment of the mail path.
    pub alias: String,
    /// Canonical address, configured or derived from alias and host.
    pub email: String,
}

/// A scraped logon form.
#[derive(Debug, Clone)]
struct LogonForm {
    action: String,
    user_field: String,
    password_field: String,
    /// Hidden inputs carried through unchanged.
    hidden: Vec<(String, String)>,
}

/// Authenticate against the OWA base URL and resolve the mailbox path.
///
/// A 401 on the initial probe means the server wants transport-level
/// authentication and the transport is expected to carry credentials on
/// retry. A logon form in the response body triggers the forms flow; its
/// POST must answer with a redirect, which is the only proof of success
/// the form gives us.
pub fn login(
    transport: &dyn HttpTransport,
    config: &SessionConfig,
) -> Result<AuthContext, GatewayError> {
    let initial = transport
        .execute(HttpRequest::new("GET", &config.base_url))
        .map_err(|e| e.with_context("initial OWA probe"))?;

    let landing = if initial.status == 401 {
        // Basic or NTLM negotiated by the transport layer.
        let retry = transport
            .execute(HttpRequest::new("GET", &config.base_url))
            .map_err(|e| e.with_context("authenticated OWA probe"))?;
        if retry.status == 401 {
            return Err(GatewayError::AuthFailed(
                "authentication rejected by server".to_string(),
            ));
        }
        retry
    } else if initial.is_redirect() {
        let location = initial.header("Location").unwrap_or_default().to_string();
        let url = absolutize(&config.base_url, &location);
        transport
            .execute(HttpRequest::new("GET", &url))
            .map_err(|e| e.with_context("OWA redirect"))?
    } else {
        initial
    };

    let mut body = landing.body_text();
    // Some gateways interpose a one-field address form before the real
    // logon page; follow it once and rescrape.
    if scrape_logon_form(&body).is_none() {
        if let Some(action) = redirect_form_action(&body) {
            let url = absolutize(&config.base_url, &action);
            body = transport
                .execute(HttpRequest::new("GET", &url))
                .map_err(|e| e.with_context("logon redirect form"))?
                .body_text();
        }
    }
    let landing_body = if let Some(form) = scrape_logon_form(&body) {
        submit_logon_form(transport, config, &form)?
    } else {
        body
    };

    resolve_mailbox(transport, config, &landing_body)
}

/// Action of a pre-logon redirect form, recognized by its `addr` input.
fn redirect_form_action(body: &str) -> Option<String> {
    let lower = body.to_lowercase();
    let form_start = lower.find("<form")?;
    let form_end = lower[form_start..]
        .find("</form")
        .map(|p| form_start + p)
        .unwrap_or(body.len());
    let form = &body[form_start..form_end];
    let has_addr = elements(form, "input").iter().any(|input| {
        attribute_value(input, "name")
            .map(|n| n.eq_ignore_ascii_case("addr"))
            .unwrap_or(false)
    });
    if has_addr {
        attribute_value(form, "action")
    } else {
        None
    }
}

fn submit_logon_form(
    transport: &dyn HttpTransport,
    config: &SessionConfig,
    form: &LogonForm,
) -> Result<String, GatewayError> {
    let mut pairs: Vec<(String, String)> = form.hidden.clone();
    pairs.push((form.user_field.clone(), config.username.clone()));
    pairs.push((form.password_field.clone(), config.password.clone()));
    // OWA logon options: public computer, basic client.
    pairs.push(("trusted".to_string(), "4".to_string()));
    pairs.push(("flags".to_string(), "4".to_string()));

    let body = urlencode_pairs(&pairs);
    let url = absolutize(&config.base_url, &form.action);
    let response = transport
        .execute(
            HttpRequest::new("POST", &url)
                .body("application/x-www-form-urlencoded", body.into_bytes()),
        )
        .map_err(|e| e.with_context("logon form submit"))?;

    // The form answers 200 with the same form again on bad credentials.
    if !response.is_redirect() {
        let text = response.body_text();
        if scrape_logon_form(&text).is_some() {
            return Err(GatewayError::AuthFailed(
                "logon form rejected credentials".to_string(),
            ));
        }
        return Ok(text);
    }

    let location = response.header("Location").unwrap_or_default().to_string();
    // reason=2 is the OWA bad-password marker even on a redirect.
    if location.contains("reason=2") {
        return Err(GatewayError::AuthFailed(
            "invalid user name or password".to_string(),
        ));
    }
    let followup = transport
        .execute(HttpRequest::new("GET", &absolutize(&config.base_url, &location)))
        .map_err(|e| e.with_context("post-logon redirect"))?;
    Ok(followup.body_text())
}

/// Derive the mailbox path, alias and email from the post-login page.
/// The page normally carries a `<base href=` pointing inside the mailbox;
/// when it does not, fall back to `/exchange/<email>/`.
fn resolve_mailbox(
    transport: &dyn HttpTransport,
    config: &SessionConfig,
    landing_body: &str,
) -> Result<AuthContext, GatewayError> {
    if let Some(href) = scrape_base_href(landing_body) {
        if let Some(mail_path) = url_path(&href) {
            let alias = last_segment(&mail_path).to_string();
            if !alias.is_empty() {
                let email = config
                    .email
                    .clone()
                    .unwrap_or_else(|| build_email(&alias, &config.base_url));
                return Ok(AuthContext {
                    mail_path,
                    alias,
                    email,
                });
            }
        }
    }

    // No base element: probe the conventional mailbox location.
    let email = match &config.email {
        Some(email) => email.clone(),
        None => build_email(&config.username, &config.base_url),
    };
    let mail_path = format!("/exchange/{}/", email);
    let probe_url = absolutize(&config.base_url, &mail_path);
    let probe = transport
        .execute(HttpRequest::new("GET", &probe_url))
        .map_err(|e| e.with_context("mailbox path probe"))?;
    if probe.status == 404 {
        return Err(GatewayError::AuthFailed(format!(
            "unable to locate mailbox for {}",
            email
        )));
    }
    let alias = email
        .split('@')
        .next()
        .unwrap_or(email.as_str())
        .to_string();
    Ok(AuthContext {
        mail_path,
        alias,
        email,
    })
}

fn build_email(alias: &str, base_url: &str) -> String {
    if alias.contains('@') {
        return alias.to_string();
    }
    // mail.example.net -> example.net
    let host = url_host(base_url).unwrap_or_default();
    let domain = match host.find('.') {
        Some(pos) => &host[pos + 1..],
        None => host.as_str(),
    };
    format!("{}@{}", alias, domain)
}

fn scrape_logon_form(body: &str) -> Option<LogonForm> {
    let lower = body.to_lowercase();
    let form_start = lower.find("<form")?;
    let form_end = lower[form_start..]
        .find("</form")
        .map(|p| form_start + p)
        .unwrap_or(body.len());
    let form = &body[form_start..form_end];

    let action = attribute_value(form, "action").unwrap_or_default();

    let mut user_field = None;
    let mut password_field = None;
    let mut hidden = Vec::new();
    for input in elements(form, "input") {
        let name = match attribute_value(input, "name") {
            Some(n) => n,
            None => continue,
        };
        if USER_NAME_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(&name)) {
            user_field = Some(name);
        } else if PASSWORD_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(&name)) {
            password_field = Some(name);
        } else {
            let value = attribute_value(input, "value").unwrap_or_default();
            hidden.push((name, value));
        }
    }

    Some(LogonForm {
        action,
        user_field: user_field?,
        password_field: password_field?,
        hidden,
    })
}

fn scrape_base_href(body: &str) -> Option<String> {
    let lower = body.to_lowercase();
    let pos = lower.find("<base")?;
    let end = body[pos..].find('>').map(|p| pos + p + 1)?;
    attribute_value(&body[pos..end], "href")
}

/// All occurrences of a given element in an HTML fragment, tag included.
fn elements<'a>(fragment: &'a str, tag: &str) -> Vec<&'a str> {
    let lower = fragment.to_lowercase();
    let marker = format!("<{}", tag);
    let mut out = Vec::new();
    let mut offset = 0;
    while let Some(pos) = lower[offset..].find(&marker) {
        let start = offset + pos;
        let end = match fragment[start..].find('>') {
            Some(p) => start + p + 1,
            None => break,
        };
        out.push(&fragment[start..end]);
        offset = end;
    }
    out
}

/// Value of an HTML attribute inside one element, quoted or bare.
fn attribute_value(element: &str, name: &str) -> Option<String> {
    let lower = element.to_lowercase();
    let needle = format!("{}=", name);
    let mut offset = 0;
    loop {
        let pos = lower[offset..].find(&needle)? + offset;
        // must be preceded by whitespace, not part of a longer name
        if pos > 0 && !lower.as_bytes()[pos - 1].is_ascii_whitespace() {
            offset = pos + needle.len();
            continue;
        }
        let rest = &element[pos + needle.len()..];
        let mut chars = rest.chars();
        return match chars.next() {
            Some(q @ ('"' | '\'')) => {
                let tail = &rest[1..];
                tail.find(q).map(|end| tail[..end].to_string())
            }
            Some(_) => {
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                Some(rest[..end].to_string())
            }
            None => None,
        };
    }
}

fn urlencode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, NON_ALPHANUMERIC),
                utf8_percent_encode(v, NON_ALPHANUMERIC)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Resolve a possibly relative location against the base URL.
pub(crate) fn absolutize(base_url: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_string();
    }
    if let Some(path) = location.strip_prefix('/') {
        if let Some(origin) = url_origin(base_url) {
            return format!("{}/{}", origin, path);
        }
    }
    let trimmed = base_url.trim_end_matches('/');
    format!("{}/{}", trimmed, location.trim_start_matches('/'))
}

/// Scheme and authority part of a URL, without trailing slash.
fn url_origin(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    let path_start = rest.find('/').map(|p| scheme_end + 3 + p).unwrap_or(url.len());
    Some(url[..path_start].to_string())
}

fn url_host(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    let end = rest.find(|c| c == '/' || c == ':').unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// Path component of an absolute URL, or the input when already a path.
pub(crate) fn url_path(url: &str) -> Option<String> {
    if let Some(scheme_end) = url.find("://") {
        let rest = &url[scheme_end + 3..];
        let path_start = rest.find('/')?;
        Some(rest[path_start..].to_string())
    } else if url.starts_with('/') {
        Some(url.to_string())
    } else {
        None
    }
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGON_PAGE: &str = concat!(
        "<html><body>\n",
        "<form action=\"/owaauth.dll\" method=\"POST\">\n",
        "<input type=\"hidden\" name=\"destination\" value=\"https://mail.example.net/exchange/\">\n",
        "<input type=\"text\" name=\"username\">\n",
        "<input type=\"password\" name=\"password\">\n",
        "</form></body></html>"
    );

    #[test]
    fn scrapes_logon_form() {
        let form = scrape_logon_form(LOGON_PAGE).unwrap();
        assert_eq!(form.action, "/owaauth.dll");
        assert_eq!(form.user_field, "username");
        assert_eq!(form.password_field, "password");
        assert_eq!(
            form.hidden,
            vec![(
                "destination".to_string(),
                "https://mail.example.net/exchange/".to_string()
            )]
        );
    }

    #[test]
    fn no_form_on_plain_page() {
        assert!(scrape_logon_form("<html><body>inbox</body></html>").is_none());
    }

    #[test]
    fn addr_form_recognized_as_redirect() {
        let body = "<form action=\"/owa/casredirect.aspx\"><input type=\"hidden\" name=\"addr\" value=\"x\"></form>";
        assert_eq!(
            redirect_form_action(body).as_deref(),
            Some("/owa/casredirect.aspx")
        );
        assert!(redirect_form_action(LOGON_PAGE).is_none());
    }

    #[test]
    fn base_href_extraction() {
        let body = "<html><head><base href=\"https://mail.example.net/exchange/jdoe/\"></head>";
        assert_eq!(
            scrape_base_href(body).as_deref(),
            Some("https://mail.example.net/exchange/jdoe/")
        );
        assert_eq!(
            url_path("https://mail.example.net/exchange/jdoe/").as_deref(),
            Some("/exchange/jdoe/")
        );
        assert_eq!(last_segment("/exchange/jdoe/"), "jdoe");
    }

    #[test]
    fn absolutize_variants() {
        let base = "https://mail.example.net/exchange/";
        assert_eq!(
            absolutize(base, "/owaauth.dll"),
            "https://mail.example.net/owaauth.dll"
        );
        assert_eq!(
            absolutize(base, "https://sso.example.net/login"),
            "https://sso.example.net/login"
        );
        assert_eq!(
            absolutize(base, "inbox/"),
            "https://mail.example.net/exchange/inbox/"
        );
    }

    #[test]
    fn email_from_alias_and_host() {
        assert_eq!(
            build_email("jdoe", "https://mail.example.net/exchange/"),
            "jdoe@example.net"
        );
        assert_eq!(
            build_email("jdoe@corp.example", "https://mail.example.net/"),
            "jdoe@corp.example"
        );
    }

    #[test]
    fn urlencoding_reserved_characters() {
        let body = urlencode_pairs(&[("password".to_string(), "p&s=1 x".to_string())]);
        assert_eq!(body, "password=p%26s%3D1%20x");
    }
}
