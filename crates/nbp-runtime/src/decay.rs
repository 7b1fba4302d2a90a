#![forbid(unsafe_code)]

//! Fade-out lifecycle for floating cursor labels.
//!
//! Each key owns exactly one [`LabelPhase`]:
//!
//! ```text
//!            touch                 tick(now >= deadline)
//!   (new) ─────────► FadingOut ───────────────────────► Hidden
//!                     ▲    │ pin                           │
//!              unpin  │    ▼                      touch    │
//!                    Visible ◄─────────────────────────────┘ (via FadingOut)
//! ```
//!
//! # Invariants
//!
//! - At most one deadline per key. `touch` replaces the deadline, never adds
//!   a second one, so repeated renders cannot produce duplicate expiries.
//! - A key is reported by [`DecayScheduler::tick`] at most once per
//!   `FadingOut` period.
//! - `touch` and `tick` see the same map entry, so a hide can never fire for a
//!   deadline that a later render already replaced.
//! - Hidden keys stay tracked (their elements stay attached) until `remove`.

use core::time::Duration;
use std::collections::BTreeMap;

/// Visibility state of one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPhase {
    /// Shown with no countdown (pinned by hover).
    Visible,
    /// Shown; hides once `deadline` passes.
    FadingOut { deadline: Duration },
    /// Attached but hidden.
    Hidden,
}

impl LabelPhase {
    #[inline]
    pub fn is_shown(self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

/// Result of [`DecayScheduler::touch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayTransition {
    /// The key was new or hidden and must be made visible.
    Shown,
    /// The key was already visible; only its deadline moved.
    Refreshed,
}

/// Per-key decay bookkeeping.
#[derive(Debug, Clone)]
pub struct DecayScheduler<K> {
    interval: Duration,
    phases: BTreeMap<K, LabelPhase>,
}

impl<K: Ord + Clone> DecayScheduler<K> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            phases: BTreeMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a successful render of `key` at `now`.
    pub fn touch(&mut self, key: &K, now: Duration) -> DecayTransition {
        let deadline = now.saturating_add(self.interval);
        match self.phases.get_mut(key) {
            Some(LabelPhase::Visible) => DecayTransition::Refreshed,
            Some(phase @ LabelPhase::FadingOut { .. }) => {
                *phase = LabelPhase::FadingOut { deadline };
                DecayTransition::Refreshed
            }
            Some(phase @ LabelPhase::Hidden) => {
                *phase = LabelPhase::FadingOut { deadline };
                DecayTransition::Shown
            }
            None => {
                self.phases
                    .insert(key.clone(), LabelPhase::FadingOut { deadline });
                DecayTransition::Shown
            }
        }
    }

    /// Keep `key` visible until [`unpin`](Self::unpin).
    ///
    /// Returns `true` when the key was hidden and must be shown again.
    pub fn pin(&mut self, key: &K) -> bool {
        match self.phases.get_mut(key) {
            Some(phase) => {
                let was_hidden = !phase.is_shown();
                *phase = LabelPhase::Visible;
                was_hidden
            }
            None => false,
        }
    }

    /// Resume the countdown for a pinned key.
    pub fn unpin(&mut self, key: &K, now: Duration) {
        if let Some(phase @ LabelPhase::Visible) = self.phases.get_mut(key) {
            *phase = LabelPhase::FadingOut {
                deadline: now.saturating_add(self.interval),
            };
        }
    }

    /// Hide every key whose deadline has passed. Returns those keys in order.
    pub fn tick(&mut self, now: Duration) -> Vec<K> {
        let mut expired = Vec::new();
        for (key, phase) in &mut self.phases {
            if let LabelPhase::FadingOut { deadline } = *phase
                && deadline <= now
            {
                *phase = LabelPhase::Hidden;
                expired.push(key.clone());
            }
        }
        expired
    }

    /// Forget `key` and its timer.
    pub fn remove(&mut self, key: &K) -> Option<LabelPhase> {
        self.phases.remove(key)
    }

    /// Forget every key and timer.
    pub fn clear(&mut self) {
        self.phases.clear();
    }

    pub fn phase(&self, key: &K) -> Option<LabelPhase> {
        self.phases.get(key).copied()
    }

    /// Earliest outstanding deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.phases
            .values()
            .filter_map(|phase| match phase {
                LabelPhase::FadingOut { deadline } => Some(*deadline),
                _ => None,
            })
            .min()
    }

    /// Number of live timers (keys in `FadingOut`).
    pub fn pending_timers(&self) -> usize {
        self.phases
            .values()
            .filter(|p| matches!(p, LabelPhase::FadingOut { .. }))
            .count()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}
