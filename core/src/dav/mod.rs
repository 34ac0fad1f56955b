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

//! WebDAV protocol codec: request generation, multistatus parsing, and the
//! byte-level tag repair applied in between.

pub mod repair;
pub mod request;
pub mod response;

pub use request::{build_mkcol, build_propfind, build_proppatch, build_search, Traversal};
pub use response::{parse_multistatus, DavProperty, MultiStatusResponse};
