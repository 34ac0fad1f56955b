/*
 * session_integration.rs
 * Copyright (C) 2026 Marco Venturi
 *
 * Integration tests for the WebDAV session against a scripted transport:
 * forms login, well-known folder discovery, the stale-URL retry on item
 * fetch, and precondition failures on concurrent updates.
 *
 * Run with:
 *   cargo test -p portalettere_core --test session_integration
 */

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use portalettere_core::http::{HttpRequest, HttpResponse, HttpTransport};
use portalettere_core::session::dav::DavSession;
use portalettere_core::session::{ExchangeSession, SessionConfig};
use portalettere_core::GatewayError;

/// One scripted exchange: expectations about the request, canned response.
struct Step {
    method: &'static str,
    url_contains: &'static str,
    response: HttpResponse,
}

/// Transport that answers from a script and records every request.
struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, GatewayError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.method.clone(), request.url.clone()));
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {} {}", request.method, request.url));
        assert_eq!(
            step.method, request.method,
            "wrong method for {}",
            request.url
        );
        assert!(
            request.url.contains(step.url_contains),
            "expected url containing {:?}, got {}",
            step.url_contains,
            request.url
        );
        Ok(step.response)
    }
}

fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: body.as_bytes().to_vec(),
    }
}

const LOGON_PAGE: &str = concat!(
    "<html><body><form action=\"/owaauth.dll\" method=\"POST\">",
    "<input type=\"hidden\" name=\"destination\" value=\"https://mail.example.net/exchange/\">",
    "<input type=\"text\" name=\"username\">",
    "<input type=\"password\" name=\"password\">",
    "</form></body></html>"
);

const MAILBOX_PAGE: &str =
    "<html><head><base href=\"https://mail.example.net/exchange/jdoe/\"></head><body/></html>";

const WELL_KNOWN_FOLDERS: &str = r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:h="urn:schemas:httpmail:">
  <D:response>
    <D:href>https://mail.example.net/exchange/jdoe/</D:href>
    <D:propstat>
      <D:prop>
        <h:inbox>https://mail.example.net/exchange/jdoe/Boite</h:inbox>
        <h:deleteditems>https://mail.example.net/exchange/jdoe/Corbeille</h:deleteditems>
        <h:sentitems>https://mail.example.net/exchange/jdoe/Envoyes</h:sentitems>
        <h:sendmsg>https://mail.example.net/exchange/jdoe/##MailSubmissionURI##</h:sendmsg>
        <h:drafts>https://mail.example.net/exchange/jdoe/Brouillons</h:drafts>
        <h:calendar>https://mail.example.net/exchange/jdoe/Calendrier</h:calendar>
        <h:contacts>https://mail.example.net/exchange/jdoe/Contacts</h:contacts>
        <h:outbox>https://mail.example.net/exchange/jdoe/Outbox</h:outbox>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

fn config() -> SessionConfig {
    SessionConfig {
        base_url: "https://mail.example.net/exchange/".to_string(),
        username: "jdoe".to_string(),
        password: "secret".to_string(),
        email: Some("jdoe@example.net".to_string()),
        delete_broken_items: false,
    }
}

/// The four exchanges every successful connect performs: login page, form
/// POST, post-logon page, well-known folder PROPFIND, plus the public
/// folder probe.
fn connect_steps() -> Vec<Step> {
    vec![
        Step {
            method: "GET",
            url_contains: "/exchange/",
            response: response(200, &[], LOGON_PAGE),
        },
        Step {
            method: "POST",
            url_contains: "/owaauth.dll",
            response: response(302, &[("Location", "/exchange/")], ""),
        },
        Step {
            method: "GET",
            url_contains: "/exchange/",
            response: response(200, &[], MAILBOX_PAGE),
        },
        Step {
            method: "PROPFIND",
            url_contains: "/exchange/jdoe/",
            response: response(207, &[], WELL_KNOWN_FOLDERS),
        },
        Step {
            method: "PROPFIND",
            url_contains: "/public/",
            response: response(404, &[], ""),
        },
    ]
}

#[test]
fn forms_login_and_folder_discovery() {
    let folder_propfind = r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:e="http://schemas.microsoft.com/exchange/" xmlns:h="urn:schemas:httpmail:">
  <D:response>
    <D:href>https://mail.example.net/exchange/jdoe/Boite/</D:href>
    <D:propstat>
      <D:prop>
        <e:outlookfolderclass>IPF.Note</e:outlookfolderclass>
        <D:displayname>Boite</D:displayname>
        <h:unreadcount>3</h:unreadcount>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let mut steps = connect_steps();
    steps.push(Step {
        method: "PROPFIND",
        url_contains: "/exchange/jdoe/Boite",
        response: response(207, &[], folder_propfind),
    });
    let transport = ScriptedTransport::new(steps);
    let mut session = DavSession::connect(transport.clone(), config()).unwrap();
    assert_eq!(session.email(), "jdoe@example.net");

    // The logical INBOX resolves to the localized folder the mailbox
    // advertised, not to a literal /Inbox path.
    let folder = session.get_folder("INBOX").unwrap();
    assert_eq!(folder.display_name, "Boite");
    assert_eq!(folder.folder_class, "IPF.Note");
    assert_eq!(folder.unread_count, Some(3));

    let requests = transport.requests();
    let last = requests.last().unwrap();
    assert_eq!(last.0, "PROPFIND");
    assert!(last.1.ends_with("/exchange/jdoe/Boite"));
}

#[test]
fn bad_password_reported_as_auth_failure() {
    let steps = vec![
        Step {
            method: "GET",
            url_contains: "/exchange/",
            response: response(200, &[], LOGON_PAGE),
        },
        Step {
            method: "POST",
            url_contains: "/owaauth.dll",
            response: response(302, &[("Location", "/owaauth.dll?reason=2")], ""),
        },
    ];
    let transport = ScriptedTransport::new(steps);
    let err = DavSession::connect(transport, config()).unwrap_err();
    assert!(matches!(err, GatewayError::AuthFailed(_)));
}

#[test]
fn stale_item_url_recovered_through_search() {
    let search_result = r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:x="http://schemas.microsoft.com/exchange/">
  <D:response>
    <D:href>https://mail.example.net/exchange/jdoe/Calendrier/renamed meeting.EML</D:href>
    <D:propstat>
      <D:prop>
        <x:permanenturl>https://mail.example.net/exchange/jdoe/-FlatUrlSpace-/abc123.EML</x:permanenturl>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;
    let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:standup\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

    let mut steps = connect_steps();
    steps.push(Step {
        method: "GET",
        url_contains: "/Calendrier/standup.EML",
        response: response(404, &[], ""),
    });
    steps.push(Step {
        method: "SEARCH",
        url_contains: "/Calendrier",
        response: response(207, &[], search_result),
    });
    steps.push(Step {
        method: "GET",
        url_contains: "/-FlatUrlSpace-/abc123.EML",
        response: response(200, &[("ETag", "\"v2\"")], ics),
    });
    let transport = ScriptedTransport::new(steps);
    let mut session = DavSession::connect(transport, config()).unwrap();

    let item = session.get_item("calendar", "standup.EML").unwrap();
    assert_eq!(item.etag.as_deref(), Some("\"v2\""));
    assert!(item.body.contains("SUMMARY:standup"));
}

#[test]
fn missing_item_is_not_found_after_failed_search() {
    let empty = r#"<?xml version="1.0"?><D:multistatus xmlns:D="DAV:"/>"#;
    let mut steps = connect_steps();
    steps.push(Step {
        method: "GET",
        url_contains: "/Calendrier/ghost.EML",
        response: response(404, &[], ""),
    });
    steps.push(Step {
        method: "SEARCH",
        url_contains: "/Calendrier",
        response: response(207, &[], empty),
    });
    let transport = ScriptedTransport::new(steps);
    let mut session = DavSession::connect(transport, config()).unwrap();

    let err = session.get_item("calendar", "ghost.EML").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn stale_etag_update_is_a_conflict() {
    let ics = "BEGIN:VCALENDAR\r\nMETHOD:PUBLISH\r\nBEGIN:VEVENT\r\nSUMMARY:standup\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    let mut steps = connect_steps();
    steps.push(Step {
        method: "PUT",
        url_contains: "/Calendrier/standup.EML",
        response: response(412, &[], ""),
    });
    let transport = ScriptedTransport::new(steps);
    let mut session = DavSession::connect(transport, config()).unwrap();

    let err = session
        .create_or_update_event("calendar", "standup.EML", ics, Some("\"v1\""), false)
        .unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn create_event_returns_fresh_etag() {
    let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:standup\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    let mut steps = connect_steps();
    steps.push(Step {
        method: "PUT",
        url_contains: "/Calendrier/standup.EML",
        response: response(201, &[("ETag", "\"v1\"")], ""),
    });
    let transport = ScriptedTransport::new(steps);
    let mut session = DavSession::connect(transport, config()).unwrap();

    let result = session
        .create_or_update_event("calendar", "standup.EML", ics, None, true)
        .unwrap();
    assert_eq!(result.status, 201);
    assert_eq!(result.etag.as_deref(), Some("\"v1\""));
}
