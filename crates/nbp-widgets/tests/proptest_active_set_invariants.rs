//! Property-based invariant tests for overlay reconciliation.
//!
//! Arbitrary sequences of awareness updates, resolver changes, and frames
//! are applied to a page with one cell-indicator widget. After every frame:
//!
//! 1. Each resolvable `(client, cell)` pair has exactly one attached indicator.
//! 2. No element survives without a key (no orphans).
//! 3. Hover listeners exist only on live elements.
//! 4. Disposal always returns the page to zero elements and listeners.

use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;

use nbp_core::{ClientId, ContainerId};
use nbp_harness::{FakeDom, StaticResolver, named_at};
use nbp_runtime::{MemoryAwareness, PresenceConfig};
use nbp_widgets::{PanelId, PresenceHub};
use proptest::prelude::*;

const CELLS: [&str; 3] = ["c0", "c1", "c2"];
const TOKENS: [&str; 4] = ["t0", "t1", "t2", "t3"];

#[derive(Debug, Clone)]
enum Op {
    /// Client publishes cursors at the given token indices.
    Publish(u64, Vec<usize>),
    Leave(u64),
    /// Token now resolves into a cell (or nowhere).
    Resolve(usize, Option<usize>),
    Frame,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (2u64..6, proptest::collection::vec(0usize..TOKENS.len(), 0..4))
            .prop_map(|(c, t)| Op::Publish(c, t)),
        (2u64..6).prop_map(Op::Leave),
        (0usize..TOKENS.len(), proptest::option::of(0usize..CELLS.len()))
            .prop_map(|(t, c)| Op::Resolve(t, c)),
        Just(Op::Frame),
    ]
}

/// Model of what should be on screen.
#[derive(Default)]
struct Model {
    cursors: std::collections::BTreeMap<u64, Vec<usize>>,
    resolved: [Option<usize>; TOKENS.len()],
}

impl Model {
    fn expected(&self) -> BTreeSet<(u64, usize)> {
        self.cursors
            .iter()
            .flat_map(|(client, tokens)| {
                tokens
                    .iter()
                    .filter_map(|t| self.resolved[*t])
                    .map(move |cell| (*client, cell))
            })
            .collect()
    }
}

const PANEL: PanelId = PanelId(1);

proptest! {
    #[test]
    fn indicators_track_resolvable_cursors(ops in proptest::collection::vec(op(), 1..40)) {
        let dom = Rc::new(FakeDom::new().with_cells(CELLS));
        let awareness = Rc::new(MemoryAwareness::new(ClientId::new(1)));
        let resolver = Rc::new(StaticResolver::new());
        let mut hub = PresenceHub::new(Rc::clone(&dom), PresenceConfig::default());
        hub.register_cells(
            PANEL,
            awareness.clone(),
            resolver.clone(),
            CELLS.iter().map(|c| ContainerId::new(*c)),
        );
        let mut model = Model::default();
        let mut now = Duration::ZERO;

        for op in ops {
            match op {
                Op::Publish(client, tokens) => {
                    let refs: Vec<&str> = tokens.iter().map(|t| TOKENS[*t]).collect();
                    awareness.set_state(ClientId::new(client), named_at("Peer", &refs));
                    model.cursors.insert(client, tokens);
                }
                Op::Leave(client) => {
                    awareness.remove_state(ClientId::new(client));
                    model.cursors.remove(&client);
                }
                Op::Resolve(token, cell) => {
                    match cell {
                        Some(cell) => resolver.set(TOKENS[token], CELLS[cell], token),
                        None => resolver.forget(TOKENS[token]),
                    }
                    model.resolved[token] = cell;
                    // Resolution changes arrive as document edits.
                    hub.notify_panel(PANEL, nbp_runtime::DirtyReasons::DOCUMENT);
                }
                Op::Frame => {
                    now += Duration::from_millis(16);
                    hub.animation_frame(now);
                    let expected = model.expected();
                    prop_assert_eq!(dom.by_class("nbp-cell-avatar").len(), expected.len());
                    prop_assert_eq!(dom.live_count(), dom.attached_count());
                    prop_assert!(dom.hover_watchers() <= dom.live_count());
                    let widget = hub.cells(PANEL).expect("cells registered");
                    prop_assert_eq!(widget.reconciler().len(), expected.len());
                }
            }
        }

        hub.dispose_all();
        prop_assert_eq!(dom.live_count(), 0);
        prop_assert_eq!(dom.hover_watchers(), 0);
        prop_assert_eq!(awareness.listener_count(), 0);
    }
}
