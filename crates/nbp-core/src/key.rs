#![forbid(unsafe_code)]

//! Identity of a rendered overlay.

use std::fmt;

use crate::awareness::{ClientId, ContainerId};

/// Key used to diff rendered overlays between passes.
///
/// The roster keys by client alone; container-scoped surfaces key by client
/// and container, so a user with cursors in two cells owns two overlays.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActiveSetKey {
    pub client: ClientId,
    pub container: Option<ContainerId>,
}

impl ActiveSetKey {
    /// Roster key.
    pub const fn client(client: ClientId) -> Self {
        Self {
            client,
            container: None,
        }
    }

    /// Container-scoped key.
    pub fn scoped(client: ClientId, container: ContainerId) -> Self {
        Self {
            client,
            container: Some(container),
        }
    }
}

impl fmt::Display for ActiveSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container {
            Some(container) => write!(f, "{}@{}", self.client, container),
            None => write!(f, "{}", self.client),
        }
    }
}
