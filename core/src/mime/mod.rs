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

//! RFC 822 reassembly for items whose native MIME export is unusable.
//!
//! Exchange hands out some messages only as a vendor binary envelope
//! (ms-tnef) or with a truncated MIME stream. For those, the message is
//! rebuilt from its fragmented properties: the repaired header block, the
//! HTML body, and one part per attachment fetched through the
//! [`AttachmentSource`] seam.

mod quoted_printable;

pub use quoted_printable::encode as encode_quoted_printable;

use crate::codec::base64;
use crate::error::GatewayError;

/// One attachment entry as enumerated by a session.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub href: String,
    pub content_id: Option<String>,
    /// Embedded message rather than a file.
    pub is_message: bool,
}

/// Session-side access to attachment bytes and metadata.
pub trait AttachmentSource {
    fn list_attachments(&mut self, item_href: &str) -> Result<Vec<Attachment>, GatewayError>;
    /// Content type as reported by a HEAD on the attachment URL.
    fn attachment_content_type(&mut self, attachment: &Attachment)
        -> Result<String, GatewayError>;
    fn attachment_content(&mut self, attachment: &Attachment) -> Result<Vec<u8>, GatewayError>;
    /// Raw RFC 822 bytes of an embedded message.
    fn message_content(&mut self, href: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Header emission with folding at the RFC 5322 soft limit.
pub struct MimeHeaderWriter {
    out: Vec<u8>,
}

const FOLD_COLUMN: usize = 76;

impl MimeHeaderWriter {
    pub fn new() -> Self {
        Self { out: Vec::new() }
    }

    /// Write one header, folding the value at whitespace.
    pub fn header(&mut self, name: &str, value: &str) {
        let mut column = name.len() + 2;
        self.out.extend_from_slice(name.as_bytes());
        self.out.extend_from_slice(b": ");
        let mut first = true;
        for word in value.split(' ') {
            if !first && column + 1 + word.len() > FOLD_COLUMN {
                self.out.extend_from_slice(b"\r\n\t");
                column = 1;
            } else if !first {
                self.out.push(b' ');
                column += 1;
            }
            self.out.extend_from_slice(word.as_bytes());
            column += word.len();
            first = false;
        }
        self.out.extend_from_slice(b"\r\n");
    }

    /// Copy an already formatted header block, normalizing line endings.
    pub fn raw_headers(&mut self, block: &str) {
        for line in block.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            self.out.extend_from_slice(line.as_bytes());
            self.out.extend_from_slice(b"\r\n");
        }
    }

    /// End the header block.
    pub fn finish(mut self) -> Vec<u8> {
        self.out.extend_from_slice(b"\r\n");
        self.out
    }
}

impl Default for MimeHeaderWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the raw header block marks a vendor binary envelope that
/// clients cannot read, which forces a rebuild.
pub fn needs_rebuild(raw_headers: &str) -> bool {
    raw_headers.to_ascii_lowercase().contains("application/ms-tnef")
}

/// Rebuild an RFC 822 message from fragmented item properties.
///
/// Attachment parts that cannot be fetched are logged and skipped;
/// delivering a partial message beats failing the whole fetch.
pub fn rebuild_message(
    item_uid: &str,
    raw_headers: &str,
    html_body: &str,
    item_href: &str,
    source: &mut dyn AttachmentSource,
) -> Result<Vec<u8>, GatewayError> {
    let headers = strip_structural_headers(raw_headers);
    let attachments = source.list_attachments(item_href)?;

    let mut writer = MimeHeaderWriter::new();
    writer.raw_headers(&headers);
    writer.header("MIME-Version", "1.0");

    if attachments.is_empty() {
        writer.header("Content-Type", "text/html; charset=utf-8");
        writer.header("Content-Transfer-Encoding", "quoted-printable");
        let mut out = writer.finish();
        out.extend_from_slice(quoted_printable::encode(html_body.as_bytes()).as_bytes());
        return Ok(out);
    }

    let related = attachments
        .iter()
        .any(|a| matches!(&a.content_id, Some(cid) if html_body.contains(&format!("cid:{}", cid))));
    let subtype = if related { "related" } else { "mixed" };
    let boundary = boundary_for(item_uid);
    writer.header(
        "Content-Type",
        &format!("multipart/{}; boundary=\"{}\"", subtype, boundary),
    );
    let mut out = writer.finish();

    // html body part
    out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    let mut part = MimeHeaderWriter::new();
    part.header("Content-Type", "text/html; charset=utf-8");
    part.header("Content-Transfer-Encoding", "quoted-printable");
    out.extend_from_slice(&part.finish());
    out.extend_from_slice(quoted_printable::encode(html_body.as_bytes()).as_bytes());
    out.extend_from_slice(b"\r\n");

    for attachment in &attachments {
        match write_attachment_part(&mut out, &boundary, attachment, related, source) {
            Ok(()) => {}
            Err(e) => {
                log::warn!("skipping attachment {}: {}", attachment.name, e);
            }
        }
    }
    out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    Ok(out)
}

fn write_attachment_part(
    out: &mut Vec<u8>,
    boundary: &str,
    attachment: &Attachment,
    related: bool,
    source: &mut dyn AttachmentSource,
) -> Result<(), GatewayError> {
    if attachment.is_message {
        let nested = source.message_content(&attachment.href)?;
        out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        let mut part = MimeHeaderWriter::new();
        part.header("Content-Type", "message/rfc822");
        part.header("Content-Transfer-Encoding", "7bit");
        out.extend_from_slice(&part.finish());
        out.extend_from_slice(&nested);
        if !nested.ends_with(b"\r\n") {
            out.extend_from_slice(b"\r\n");
        }
        return Ok(());
    }

    let mut content_type = source.attachment_content_type(attachment)?;
    // Exchange reports stored PDFs as opaque bytes.
    if content_type.eq_ignore_ascii_case("application/octet-stream")
        && attachment.name.to_ascii_lowercase().ends_with(".pdf")
    {
        content_type = "application/pdf".to_string();
    }
    let content = source.attachment_content(attachment)?;

    out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    let mut part = MimeHeaderWriter::new();
    part.header(
        "Content-Type",
        &format!("{}; name=\"{}\"", content_type, attachment.name),
    );
    if related {
        if let Some(cid) = &attachment.content_id {
            part.header("Content-ID", &format!("<{}>", cid));
        }
    }
    if content_type.starts_with("text/") {
        part.header("Content-Transfer-Encoding", "quoted-printable");
        part.header(
            "Content-Disposition",
            &format!("attachment; filename=\"{}\"", attachment.name),
        );
        out.extend_from_slice(&part.finish());
        out.extend_from_slice(quoted_printable::encode(&content).as_bytes());
    } else {
        part.header("Content-Transfer-Encoding", "base64");
        part.header(
            "Content-Disposition",
            &format!("attachment; filename=\"{}\"", attachment.name),
        );
        out.extend_from_slice(&part.finish());
        out.extend_from_slice(base64::encode_folded(&content).as_bytes());
    }
    if !out.ends_with(b"\r\n") {
        out.extend_from_slice(b"\r\n");
    }
    Ok(())
}

/// Remove structural headers that the rebuild re-emits.
fn strip_structural_headers(raw_headers: &str) -> String {
    let mut out = String::new();
    let mut skipping = false;
    for line in raw_headers.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with(' ') || line.starts_with('\t') {
            if !skipping {
                out.push_str(line);
                out.push_str("\r\n");
            }
            continue;
        }
        let lower = line.to_ascii_lowercase();
        skipping = lower.starts_with("content-type:")
            || lower.starts_with("content-transfer-encoding:")
            || lower.starts_with("mime-version:");
        if !skipping && !line.is_empty() {
            out.push_str(line);
            out.push_str("\r\n");
        }
    }
    out
}

/// Stable per-item boundary so repeated fetches of the same item compare
/// equal byte for byte.
fn boundary_for(item_uid: &str) -> String {
    // FNV-1a 64
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in item_uid.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("----=_Part_{:016x}", hash)
}
