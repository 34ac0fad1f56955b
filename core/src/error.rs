/*
 * error.rs
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

//! Gateway errors.
//!
//! Callers match on the variant to pick a recovery policy: NotFound and
//! PreconditionFailed are protocol outcomes, Transport is retryable at the
//! connection layer, AuthFailed means re-prompt for credentials.

use std::fmt;

/// Errors from session, codec, or protocol operations.
#[derive(Debug)]
pub enum GatewayError {
    /// Network or I/O failure below the protocol layer.
    Transport {
        message: String,
        source: Option<std::io::Error>,
    },
    /// Credentials rejected, or form login did not produce its redirect proof.
    AuthFailed(String),
    /// Item or folder does not exist (after any documented failover).
    NotFound { path: String },
    /// Update rejected because the held etag or change key is stale.
    PreconditionFailed { path: String },
    /// Response body or stored item could not be parsed.
    Malformed { message: String, path: Option<String> },
    /// Unexpected HTTP status with operation context.
    Http { status: u16, message: String },
}

impl GatewayError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            source: None,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed {
            message: msg.into(),
            path: None,
        }
    }

    pub fn malformed_at(msg: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Malformed {
            message: msg.into(),
            path: Some(path.into()),
        }
    }

    pub fn http(status: u16, msg: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: msg.into(),
        }
    }

    /// Attach operation context (URL, item name) to a transport error.
    pub fn with_context(self, context: &str) -> Self {
        match self {
            Self::Transport { message, source } => Self::Transport {
                message: format!("{}: {}", context, message),
                source,
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Transport { message, .. } => write!(f, "transport error: {}", message),
            GatewayError::AuthFailed(m) => write!(f, "authentication failed: {}", m),
            GatewayError::NotFound { path } => write!(f, "not found: {}", path),
            GatewayError::PreconditionFailed { path } => {
                write!(f, "precondition failed: {}", path)
            }
            GatewayError::Malformed { message, path } => match path {
                Some(p) => write!(f, "malformed item at {}: {}", p, message),
                None => write!(f, "malformed response: {}", message),
            },
            GatewayError::Http { status, message } => {
                write!(f, "unexpected status {}: {}", status, message)
            }
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Transport {
                source: Some(e), ..
            } => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Transport {
            message: e.to_string(),
            source: Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prepends_operation() {
        let e = GatewayError::transport("connection reset")
            .with_context("PROPFIND /exchange/user/Inbox");
        assert_eq!(
            e.to_string(),
            "transport error: PROPFIND /exchange/user/Inbox: connection reset"
        );
    }

    #[test]
    fn conflict_is_distinguishable() {
        let e = GatewayError::PreconditionFailed {
            path: "/mbx/Calendar/x.EML".to_string(),
        };
        assert!(e.is_conflict());
        assert!(!e.is_not_found());
    }
}
