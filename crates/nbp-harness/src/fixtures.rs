#![forbid(unsafe_code)]

//! Peer-state builders.

use nbp_core::{ClientId, CursorState, PeerState, RawUser, RelativePosition};

pub fn client(id: u64) -> ClientId {
    ClientId::new(id)
}

/// Collapsed cursor at `token`.
pub fn caret(token: &str) -> CursorState {
    CursorState::caret(RelativePosition::new(token))
}

/// A named peer without cursors.
pub fn named(name: &str) -> PeerState {
    PeerState::with_user(RawUser::named(name))
}

/// A named peer with one cursor per token.
pub fn named_at(name: &str, tokens: &[&str]) -> PeerState {
    tokens
        .iter()
        .fold(named(name), |peer, token| peer.cursor(caret(token)))
}

/// A peer with cursors but no user payload.
pub fn anonymous_at(tokens: &[&str]) -> PeerState {
    tokens
        .iter()
        .fold(PeerState::default(), |peer, token| peer.cursor(caret(token)))
}
