#![forbid(unsafe_code)]

//! JSON input parser for awareness payloads forwarded by the host page.
//!
//! The page serializes `awareness.getStates()` into:
//!
//! ```json
//! {
//!   "local": 1,
//!   "states": [
//!     {
//!       "client": 7,
//!       "user": { "name": "Ada", "displayName": "Ada L.", "color": "#f00" },
//!       "cursors": [ { "anchor": {...}, "head": {...}, "empty": true, "primary": true } ]
//!     }
//!   ]
//! }
//! ```
//!
//! Relative positions are opaque to this layer. Each one is re-serialized to
//! a canonical JSON string (object keys sorted) and used as the position
//! token, so the host's resolver callback receives exactly what it produced.

use nbp_core::{ClientId, CursorState, PeerState, PresenceError, RawUser, RelativePosition};
use serde::Deserialize;
use serde_json::Value;

/// One parsed `getStates()` result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwarenessUpdate {
    pub local: Option<ClientId>,
    pub states: Vec<(ClientId, PeerState)>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    #[serde(default)]
    local: Option<u64>,
    #[serde(default)]
    states: Vec<RawPeer>,
}

#[derive(Debug, Deserialize)]
struct RawPeer {
    client: u64,
    #[serde(default)]
    user: Option<RawUserFields>,
    #[serde(default)]
    cursors: Option<Vec<RawCursor>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUserFields {
    #[serde(default, alias = "display_name")]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default, alias = "avatar_url", alias = "avatar")]
    avatar_url: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCursor {
    #[serde(default)]
    anchor: Value,
    #[serde(default)]
    head: Value,
    #[serde(default)]
    empty: Option<bool>,
    #[serde(default)]
    primary: Option<bool>,
}

/// Canonical token for an opaque relative position. `None` for `null`.
pub fn position_token(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        // serde_json keeps object keys sorted without `preserve_order`.
        other => Some(other.to_string()),
    }
}

fn cursor(client: u64, raw: RawCursor) -> Result<CursorState, PresenceError> {
    let head = position_token(&raw.head).ok_or_else(|| {
        PresenceError::malformed(Some(ClientId::new(client)), "cursor without a head position")
    })?;
    // A missing anchor means a collapsed selection.
    let anchor = position_token(&raw.anchor).unwrap_or_else(|| head.clone());
    let empty = raw.empty.unwrap_or(anchor == head);
    Ok(CursorState {
        anchor: RelativePosition::new(anchor),
        head: RelativePosition::new(head),
        empty,
        primary: raw.primary.unwrap_or(true),
    })
}

fn peer(raw: RawPeer) -> Result<(ClientId, PeerState), PresenceError> {
    let user = raw.user.map(|u| RawUser {
        display_name: u.display_name,
        name: u.name,
        color: u.color,
        avatar_url: u.avatar_url,
        email: u.email,
    });
    let cursors = raw
        .cursors
        .map(|list| {
            list.into_iter()
                .map(|c| cursor(raw.client, c))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    Ok((ClientId::new(raw.client), PeerState { user, cursors }))
}

/// Parse an awareness payload.
///
/// Structural problems (bad JSON, a cursor with no head) fail the whole
/// update; the caller keeps its previous states.
pub fn parse_awareness(json: &str) -> Result<AwarenessUpdate, PresenceError> {
    let raw: RawUpdate = serde_json::from_str(json)
        .map_err(|err| PresenceError::malformed(None, format!("invalid awareness JSON: {err}")))?;
    let states = raw
        .states
        .into_iter()
        .map(peer)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AwarenessUpdate {
        local: raw.local.map(ClientId::new),
        states,
    })
}
