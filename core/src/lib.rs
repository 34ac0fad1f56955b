/*
 * lib.rs
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

//! Exchange gateway core: session management and item-model translation.
//!
//! The crate talks to a Microsoft Exchange server over its WebDAV interface
//! or, for servers that retired WebDAV, over Exchange Web Services, and
//! exposes one capability set ([`session::ExchangeSession`]) that standard
//! protocol front-ends (IMAP, SMTP, CalDAV, CardDAV) can be built on.
//! Around the sessions sit the structured-text codecs (base64 folding, SMTP
//! dot stuffing, iCalendar line folding), the vCard/vCalendar object model,
//! the MAPI field table shared by both wire dialects, and RFC 822 rebuild
//! for items without a usable native MIME export.

pub mod codec;
pub mod dav;
pub mod error;
pub mod ews;
pub mod field;
pub mod http;
pub mod mime;
pub mod session;
pub mod vobject;

pub use error::GatewayError;
