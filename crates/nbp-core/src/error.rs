#![forbid(unsafe_code)]

//! Error types.
//!
//! Presence is a non-critical layer: none of these errors reach the end user.
//! They exist so that update boundaries can catch a failure, log it, and
//! degrade the affected surface to "no presence shown" for one pass.

use crate::awareness::{ClientId, ContainerId};

/// Failure inside the presence pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceError {
    /// An awareness payload did not have the expected shape.
    MalformedPayload {
        client: Option<ClientId>,
        reason: String,
    },
    /// The host rejected a DOM operation.
    Host(HostError),
    /// The component was already disposed.
    Disposed,
}

impl PresenceError {
    pub fn malformed(client: Option<ClientId>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            client,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for PresenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedPayload {
                client: Some(client),
                reason,
            } => write!(f, "malformed awareness payload from client {client}: {reason}"),
            Self::MalformedPayload {
                client: None,
                reason,
            } => write!(f, "malformed awareness payload: {reason}"),
            Self::Host(err) => write!(f, "host error: {err}"),
            Self::Disposed => write!(f, "presence component already disposed"),
        }
    }
}

impl std::error::Error for PresenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for PresenceError {
    fn from(err: HostError) -> Self {
        Self::Host(err)
    }
}

/// DOM-side failure reported by an [`OverlayHost`](crate::host::OverlayHost).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The requested mount point (toolbar or cell element) does not exist.
    MountMissing(String),
    /// The element handle is unknown or already removed.
    UnknownElement(u64),
    /// Generic unsupported operation.
    Unsupported(&'static str),
}

impl HostError {
    pub fn missing_cell(container: &ContainerId) -> Self {
        Self::MountMissing(format!("cell {container}"))
    }
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MountMissing(what) => write!(f, "mount point missing: {what}"),
            Self::UnknownElement(id) => write!(f, "unknown element #{id}"),
            Self::Unsupported(msg) => write!(f, "unsupported: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}
