#![forbid(unsafe_code)]

//! State snapshot builders.
//!
//! Each surface turns the current [`AwarenessSnapshot`] into a keyed map of
//! render requests. The map's key set is the surface's active set for this
//! pass; the reconciler diffs it against what is on screen.
//!
//! # Rules
//!
//! - Only the `head` of a cursor is resolved.
//! - A head that fails to resolve is dropped silently; it will be retried on
//!   the next notification.
//! - Container-scoped surfaces keep only cursors whose resolved container is
//!   admitted by their [`ContainerScope`].
//! - For a given client and container the first matching cursor wins.

use std::collections::BTreeMap;

use ahash::AHashSet;

use crate::awareness::{AbsolutePosition, AwarenessSnapshot, ContainerId, PositionResolver};
use crate::error::PresenceError;
use crate::identity::{NamePolicy, RemoteUser, normalize};
use crate::key::ActiveSetKey;

/// Which containers a scoped surface cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerScope {
    /// A single editor.
    Only(ContainerId),
    /// A set of cells (the cells currently present in a notebook).
    AnyOf(AHashSet<ContainerId>),
}

impl ContainerScope {
    /// Whether cursors in `container` belong to this scope.
    pub fn admits(&self, container: &ContainerId) -> bool {
        match self {
            Self::Only(only) => only == container,
            Self::AnyOf(set) => set.contains(container),
        }
    }
}

/// Render request for a container-scoped overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedRequest {
    pub user: RemoteUser,
    pub position: AbsolutePosition,
}

/// Roster requests: one per remote user, regardless of cursor location.
pub fn build_roster(
    snapshot: &AwarenessSnapshot,
    policy: NamePolicy,
) -> BTreeMap<ActiveSetKey, RemoteUser> {
    snapshot
        .iter()
        .filter_map(|(client, peer)| {
            normalize(client, peer.user.as_ref(), policy)
                .map(|user| (ActiveSetKey::client(client), user))
        })
        .collect()
}

/// Container-scoped requests keyed by `(client, container)`.
///
/// Fails only for structurally invalid payloads (a cursor without a position
/// token); resolution failures are not errors.
pub fn build_scoped(
    snapshot: &AwarenessSnapshot,
    scope: &ContainerScope,
    resolver: &dyn PositionResolver,
    policy: NamePolicy,
) -> Result<BTreeMap<ActiveSetKey, ScopedRequest>, PresenceError> {
    let mut out = BTreeMap::new();
    for (client, peer) in snapshot.iter() {
        let mut user: Option<RemoteUser> = None;
        for cursor in peer.cursors() {
            if cursor.head.token().is_empty() {
                return Err(PresenceError::malformed(
                    Some(client),
                    "cursor head has an empty position token",
                ));
            }
            let Some(position) = resolver.resolve(&cursor.head) else {
                #[cfg(feature = "tracing")]
                tracing::trace!(client = client.get(), "cursor head did not resolve");
                continue;
            };
            if !scope.admits(&position.container) {
                continue;
            }
            let key = ActiveSetKey::scoped(client, position.container.clone());
            if out.contains_key(&key) {
                continue;
            }
            if user.is_none() {
                match normalize(client, peer.user.as_ref(), policy) {
                    Some(u) => user = Some(u),
                    // No name under a skipping policy: the whole peer is dropped.
                    None => break,
                }
            }
            if let Some(user) = &user {
                out.insert(
                    key,
                    ScopedRequest {
                        user: user.clone(),
                        position,
                    },
                );
            }
        }
    }
    Ok(out)
}
