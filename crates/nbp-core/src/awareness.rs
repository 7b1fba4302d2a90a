#![forbid(unsafe_code)]

//! Awareness data model and the collaboration-layer traits it is read through.
//!
//! The CRDT engine, the awareness broadcast channel, and the editor's text
//! layout all live outside this workspace. They are consumed through three
//! small traits: [`Awareness`], [`PositionResolver`], and [`EditorLayout`].

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::geometry::Point;
use crate::identity::RawUser;

/// Identifier of one connected collaboration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(u64);

impl ClientId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a sub-document (one notebook cell, one editor).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(Arc<str>);

impl ContainerId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContainerId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Opaque CRDT-relative locator.
///
/// The token is whatever encoding the collaboration layer uses; only a
/// [`PositionResolver`] interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativePosition(Arc<str>);

impl RelativePosition {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

/// A resolved position: the container it lives in and a character offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbsolutePosition {
    pub container: ContainerId,
    pub offset: usize,
}

impl AbsolutePosition {
    pub fn new(container: impl Into<ContainerId>, offset: usize) -> Self {
        Self {
            container: container.into(),
            offset,
        }
    }
}

/// One remote selection. Only `head` is used for positioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    pub anchor: RelativePosition,
    pub head: RelativePosition,
    pub empty: bool,
    pub primary: bool,
}

impl CursorState {
    /// A collapsed cursor (anchor == head).
    pub fn caret(at: RelativePosition) -> Self {
        Self {
            anchor: at.clone(),
            head: at,
            empty: true,
            primary: true,
        }
    }
}

/// What one remote client publishes on the awareness channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerState {
    pub user: Option<RawUser>,
    pub cursors: Option<Vec<CursorState>>,
}

impl PeerState {
    pub fn with_user(user: RawUser) -> Self {
        Self {
            user: Some(user),
            cursors: None,
        }
    }

    #[must_use]
    pub fn cursor(mut self, cursor: CursorState) -> Self {
        self.cursors.get_or_insert_with(Vec::new).push(cursor);
        self
    }

    /// Iterate cursors, treating a missing list as empty.
    pub fn cursors(&self) -> impl Iterator<Item = &CursorState> {
        self.cursors.iter().flatten()
    }
}

/// Remote states at one instant, keyed by client id.
///
/// The local session is excluded at construction time, so every entry is a
/// remote collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwarenessSnapshot {
    peers: BTreeMap<ClientId, PeerState>,
}

impl AwarenessSnapshot {
    /// Build a snapshot from raw states, dropping `local`.
    pub fn from_states(
        local: ClientId,
        states: impl IntoIterator<Item = (ClientId, PeerState)>,
    ) -> Self {
        let peers = states
            .into_iter()
            .filter(|(id, _)| *id != local)
            .collect();
        Self { peers }
    }

    /// Read the current snapshot from an awareness channel.
    pub fn capture(awareness: &dyn Awareness) -> Self {
        Self::from_states(awareness.local_client_id(), awareness.states())
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn get(&self, client: ClientId) -> Option<&PeerState> {
        self.peers.get(&client)
    }

    /// Peers in ascending client-id order.
    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &PeerState)> {
        self.peers.iter().map(|(id, state)| (*id, state))
    }
}

/// Listener registration handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Client ids touched by one awareness update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwarenessChange {
    pub added: Vec<ClientId>,
    pub updated: Vec<ClientId>,
    pub removed: Vec<ClientId>,
}

impl AwarenessChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// The awareness side-channel of a collaborative session.
pub trait Awareness {
    /// This session's own client id; never rendered.
    fn local_client_id(&self) -> ClientId;

    /// Every known state, including the local one.
    fn states(&self) -> Vec<(ClientId, PeerState)>;

    /// Register a change listener.
    fn subscribe(&self, listener: Rc<dyn Fn(&AwarenessChange)>) -> ListenerId;

    /// Unregister a listener. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: ListenerId) -> bool;
}

/// Resolves CRDT-relative positions against the live document.
pub trait PositionResolver {
    /// `None` when the anchored content was deleted or moved away.
    fn resolve(&self, position: &RelativePosition) -> Option<AbsolutePosition>;
}

/// Text-layout queries against one editor view.
pub trait EditorLayout {
    /// The container this editor displays.
    fn container(&self) -> &ContainerId;

    /// Current document length in characters.
    fn document_length(&self) -> usize;

    /// Viewport coordinates of `offset`, or `None` when it is not laid out.
    fn coords_at(&self, offset: usize) -> Option<Point>;
}
