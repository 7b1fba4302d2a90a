#![forbid(unsafe_code)]

//! Identity normalization for remote collaborators.
//!
//! Awareness payloads carry whatever the remote client chose to publish: a
//! display name, a plain name, maybe a color, maybe nothing at all. This
//! module turns that raw payload into a [`RemoteUser`] with every derived
//! field filled in.
//!
//! # Invariants
//!
//! - Derived fields (`color`, `initials`) are pure functions of the name and
//!   are recomputed on every observation, never cached across snapshots.
//! - Two observations with the same name always produce the same color, no
//!   matter which client id they come from.
//! - [`name_hash`] iterates UTF-16 code units with a wrapping `i32`
//!   accumulator, so colors agree with browser-side peers hashing the same
//!   string.

use unicode_segmentation::UnicodeSegmentation;

use crate::awareness::ClientId;

/// Fixed color palette for users that do not publish their own color.
pub const PALETTE: [&str; 15] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#9a6324",
    "#469990", "#800000", "#808000", "#000075", "#e6a817", "#2f9e44", "#c2255c",
];

/// Initials shown when a name has no usable characters.
pub const UNKNOWN_INITIALS: &str = "??";

/// How a surface treats a collaborator that published no usable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// Synthesize `"User {client_id}"`.
    #[default]
    Fallback,
    /// Drop the collaborator from this surface.
    Skip,
}

/// Identity fields as published in an awareness payload.
///
/// Blank strings are treated the same as missing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawUser {
    pub display_name: Option<String>,
    pub name: Option<String>,
    pub color: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

impl RawUser {
    /// Create a raw user with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set an explicit color.
    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set the avatar image URL.
    #[must_use]
    pub fn avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Set the email address.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// The first usable name: display name, then name.
    pub fn resolved_name(&self) -> Option<&str> {
        non_blank(self.display_name.as_deref()).or_else(|| non_blank(self.name.as_deref()))
    }
}

/// A normalized remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub client_id: ClientId,
    pub name: String,
    pub color: String,
    pub initials: String,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

impl RemoteUser {
    /// Title line used in hover details: the name, plus the email when known.
    pub fn title(&self) -> String {
        match &self.email {
            Some(email) => format!("{} <{email}>", self.name),
            None => self.name.clone(),
        }
    }
}

/// Normalize a raw payload into a [`RemoteUser`].
///
/// Returns `None` only when the payload has no usable name and `policy` is
/// [`NamePolicy::Skip`]. A missing payload is treated like an empty one.
pub fn normalize(
    client_id: ClientId,
    raw: Option<&RawUser>,
    policy: NamePolicy,
) -> Option<RemoteUser> {
    let name = match raw.and_then(RawUser::resolved_name) {
        Some(name) => name.trim().to_string(),
        None => match policy {
            NamePolicy::Fallback => fallback_name(client_id),
            NamePolicy::Skip => return None,
        },
    };
    let color = raw
        .and_then(|r| non_blank(r.color.as_deref()))
        .map(str::to_string)
        .unwrap_or_else(|| name_color(&name).to_string());
    Some(RemoteUser {
        client_id,
        initials: initials(&name),
        color,
        avatar_url: raw
            .and_then(|r| non_blank(r.avatar_url.as_deref()))
            .map(str::to_string),
        email: raw
            .and_then(|r| non_blank(r.email.as_deref()))
            .map(str::to_string),
        name,
    })
}

/// Synthesized name for collaborators without one.
pub fn fallback_name(client_id: ClientId) -> String {
    format!("User {}", client_id.get())
}

/// Polynomial rolling hash (`h * 31 + unit`) over UTF-16 code units,
/// wrapping in the signed 32-bit range.
pub fn name_hash(name: &str) -> i32 {
    name.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Deterministic palette color for a name.
pub fn name_color(name: &str) -> &'static str {
    let idx = name_hash(name).unsigned_abs() as usize % PALETTE.len();
    PALETTE[idx]
}

/// Initials for a name.
///
/// Single word: its first two graphemes. Several words: first grapheme of the
/// first and last word. Always uppercased; [`UNKNOWN_INITIALS`] when empty.
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let raw: String = match words.as_slice() {
        [] => return UNKNOWN_INITIALS.to_string(),
        [single] => single.graphemes(true).take(2).collect(),
        [first, .., last] => first
            .graphemes(true)
            .take(1)
            .chain(last.graphemes(true).take(1))
            .collect(),
    };
    raw.to_uppercase()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> ClientId {
        ClientId::new(n)
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(name_hash(""), 0);
        assert_eq!(name_hash("a"), 97);
        assert_eq!(name_hash("Bob"), 66965);
        assert_eq!(name_hash("Ada Lovelace"), -878_886_773);
        assert_eq!(name_hash("Grace Hopper"), 1_882_396_124);
    }

    #[test]
    fn hash_uses_utf16_code_units() {
        assert_eq!(name_hash("Zoë"), 90166);
        assert_eq!(name_hash("日本"), 835_047);
    }

    #[test]
    fn color_indexes_follow_hash() {
        assert_eq!(name_color("Ada Lovelace"), PALETTE[8]);
        assert_eq!(name_color("Bob"), PALETTE[5]);
        assert_eq!(name_color("Alice"), PALETTE[13]);
        assert_eq!(name_color(""), PALETTE[0]);
    }

    #[test]
    fn color_handles_min_hash() {
        // unsigned_abs keeps i32::MIN in range.
        let idx = i32::MIN.unsigned_abs() as usize % PALETTE.len();
        assert!(idx < PALETTE.len());
    }

    #[test]
    fn initials_two_words() {
        assert_eq!(initials("Ada Lovelace"), "AL");
        assert_eq!(initials("grace brewster murray hopper"), "GH");
    }

    #[test]
    fn initials_single_word() {
        assert_eq!(initials("bob"), "BO");
        assert_eq!(initials("X"), "X");
    }

    #[test]
    fn initials_empty_or_blank() {
        assert_eq!(initials(""), "??");
        assert_eq!(initials("   "), "??");
    }

    #[test]
    fn initials_keep_grapheme_clusters() {
        assert_eq!(initials("e\u{301}mile zola"), "E\u{301}Z");
    }

    #[test]
    fn normalize_prefers_display_name() {
        let raw = RawUser::named("ada").display_name("Ada Lovelace");
        let user = normalize(id(7), Some(&raw), NamePolicy::Skip).unwrap();
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.initials, "AL");
        assert_eq!(user.color, name_color("Ada Lovelace"));
    }

    #[test]
    fn normalize_blank_display_name_falls_through() {
        let raw = RawUser::named("Bob").display_name("  ");
        let user = normalize(id(1), Some(&raw), NamePolicy::Fallback).unwrap();
        assert_eq!(user.name, "Bob");
    }

    #[test]
    fn normalize_explicit_color_wins() {
        let raw = RawUser::named("Bob").color("#123456");
        let user = normalize(id(1), Some(&raw), NamePolicy::Fallback).unwrap();
        assert_eq!(user.color, "#123456");
    }

    #[test]
    fn normalize_fallback_policy_synthesizes_name() {
        let user = normalize(id(42), None, NamePolicy::Fallback).unwrap();
        assert_eq!(user.name, "User 42");
        assert_eq!(user.initials, "U4");
    }

    #[test]
    fn normalize_skip_policy_drops_unnamed() {
        assert!(normalize(id(42), None, NamePolicy::Skip).is_none());
        let raw = RawUser::default().color("#fff");
        assert!(normalize(id(42), Some(&raw), NamePolicy::Skip).is_none());
    }

    #[test]
    fn same_name_same_color_across_clients() {
        let a = normalize(id(1), Some(&RawUser::named("Bob")), NamePolicy::Fallback).unwrap();
        let b = normalize(id(2), Some(&RawUser::named("Bob")), NamePolicy::Fallback).unwrap();
        assert_eq!(a.color, b.color);
        assert_ne!(a.client_id, b.client_id);
    }

    #[test]
    fn title_includes_email() {
        let raw = RawUser::named("Ada").email("ada@example.org");
        let user = normalize(id(3), Some(&raw), NamePolicy::Fallback).unwrap();
        assert_eq!(user.title(), "Ada <ada@example.org>");
    }
}
