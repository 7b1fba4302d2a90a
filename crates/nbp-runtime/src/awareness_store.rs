#![forbid(unsafe_code)]

//! Host-fed awareness store.
//!
//! The browser host owns the real awareness channel. It forwards every state
//! map it sees into a [`MemoryAwareness`], which computes the change set and
//! notifies subscribers synchronously, the same way the channel's own
//! `change` event would.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use nbp_core::{Awareness, AwarenessChange, ClientId, ListenerId, PeerState};

type Listener = Rc<dyn Fn(&AwarenessChange)>;

/// In-memory [`Awareness`] implementation.
pub struct MemoryAwareness {
    local: ClientId,
    states: RefCell<BTreeMap<ClientId, PeerState>>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<u64>,
}

impl std::fmt::Debug for MemoryAwareness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAwareness")
            .field("local", &self.local)
            .field("states", &self.states.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl MemoryAwareness {
    pub fn new(local: ClientId) -> Self {
        Self {
            local,
            states: RefCell::new(BTreeMap::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
        }
    }

    /// Insert or replace one client's state.
    pub fn set_state(&self, client: ClientId, state: PeerState) -> AwarenessChange {
        let mut change = AwarenessChange::default();
        {
            let mut states = self.states.borrow_mut();
            match states.insert(client, state.clone()) {
                None => change.added.push(client),
                Some(previous) if previous != state => change.updated.push(client),
                Some(_) => {}
            }
        }
        self.emit(&change);
        change
    }

    /// Drop one client's state (disconnect or timeout).
    pub fn remove_state(&self, client: ClientId) -> AwarenessChange {
        let mut change = AwarenessChange::default();
        if self.states.borrow_mut().remove(&client).is_some() {
            change.removed.push(client);
        }
        self.emit(&change);
        change
    }

    /// Replace the whole state map, as when the host forwards a full
    /// `getStates()` result.
    pub fn replace_all(
        &self,
        states: impl IntoIterator<Item = (ClientId, PeerState)>,
    ) -> AwarenessChange {
        let next: BTreeMap<ClientId, PeerState> = states.into_iter().collect();
        let mut change = AwarenessChange::default();
        {
            let mut current = self.states.borrow_mut();
            for (client, state) in &next {
                match current.get(client) {
                    None => change.added.push(*client),
                    Some(previous) if previous != state => change.updated.push(*client),
                    Some(_) => {}
                }
            }
            change.removed = current
                .keys()
                .filter(|client| !next.contains_key(client))
                .copied()
                .collect();
            *current = next;
        }
        self.emit(&change);
        change
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn len(&self) -> usize {
        self.states.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.borrow().is_empty()
    }

    fn emit(&self, change: &AwarenessChange) {
        if change.is_empty() {
            return;
        }
        // Snapshot the list: listeners may read states or unsubscribe.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        tracing::trace!(
            added = change.added.len(),
            updated = change.updated.len(),
            removed = change.removed.len(),
            listeners = listeners.len(),
            "awareness change"
        );
        for listener in listeners {
            listener(change);
        }
    }
}

impl Awareness for MemoryAwareness {
    fn local_client_id(&self) -> ClientId {
        self.local
    }

    fn states(&self) -> Vec<(ClientId, PeerState)> {
        self.states
            .borrow()
            .iter()
            .map(|(id, state)| (*id, state.clone()))
            .collect()
    }

    fn subscribe(&self, listener: Rc<dyn Fn(&AwarenessChange)>) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0.wrapping_add(1));
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}
