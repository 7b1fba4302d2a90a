#![forbid(unsafe_code)]

//! Toolbar roster: one avatar per remote collaborator.
//!
//! Collaborators are ordered by client id. The first `max_avatars` get an
//! avatar; the rest are summarized by a single `+N` overflow chip whose hover
//! modal lists their names.

use std::collections::BTreeMap;
use std::rc::Rc;

use nbp_core::snapshot::build_roster;
use nbp_core::{
    ActiveSetKey, Awareness, AwarenessSnapshot, ElementId, ElementSpec, HostError, Mount,
    NamePolicy, OverlayHost, PresenceError, RemoteUser,
};

use crate::avatar::paint_avatar;
use crate::modal::{ModalContent, ModalKey};
use crate::projection::{PassReport, Projection, RenderOutcome};

const AVATAR: ElementSpec = ElementSpec::div("nbp-roster-avatar");
const OVERFLOW: ElementSpec = ElementSpec::div("nbp-roster-overflow");

/// Chrome key of the overflow chip.
pub const OVERFLOW_CHIP: &str = "roster-overflow";

pub struct RosterProjection {
    awareness: Rc<dyn Awareness>,
    policy: NamePolicy,
    max_avatars: usize,
    overflow: Vec<RemoteUser>,
    chip: Option<ElementId>,
}

impl RosterProjection {
    pub fn new(awareness: Rc<dyn Awareness>, policy: NamePolicy, max_avatars: usize) -> Self {
        Self {
            awareness,
            policy,
            max_avatars: max_avatars.max(1),
            overflow: Vec::new(),
            chip: None,
        }
    }

    /// Collaborators summarized by the overflow chip.
    pub fn overflow(&self) -> &[RemoteUser] {
        &self.overflow
    }

    pub fn chip(&self) -> Option<ElementId> {
        self.chip
    }

    fn sync_chip(&mut self, host: &dyn OverlayHost) -> Result<(), HostError> {
        if self.overflow.is_empty() {
            if let Some(chip) = self.chip.take() {
                host.remove(chip);
            }
            return Ok(());
        }
        let chip = match self.chip {
            Some(chip) => chip,
            None => {
                let chip = host.create(&OVERFLOW)?;
                if let Err(err) = host
                    .attach(chip, &Mount::Toolbar)
                    .and_then(|()| host.watch_hover(chip))
                {
                    host.remove(chip);
                    return Err(err);
                }
                self.chip = Some(chip);
                chip
            }
        };
        host.set_text(chip, &format!("+{}", self.overflow.len()))?;
        let names: Vec<&str> = self.overflow.iter().map(|u| u.name.as_str()).collect();
        host.set_attribute(chip, "title", &names.join(", "))
    }
}

impl Projection for RosterProjection {
    type Request = RemoteUser;

    fn name(&self) -> &'static str {
        "roster"
    }

    fn collect(&mut self) -> Result<BTreeMap<ActiveSetKey, RemoteUser>, PresenceError> {
        let snapshot = AwarenessSnapshot::capture(&*self.awareness);
        let mut shown = BTreeMap::new();
        self.overflow.clear();
        for (key, user) in build_roster(&snapshot, self.policy) {
            if shown.len() < self.max_avatars {
                shown.insert(key, user);
            } else {
                self.overflow.push(user);
            }
        }
        Ok(shown)
    }

    fn mount(&self, _key: &ActiveSetKey, _user: &RemoteUser) -> Mount {
        Mount::Toolbar
    }

    fn render(
        &mut self,
        host: &dyn OverlayHost,
        _key: &ActiveSetKey,
        _user: &RemoteUser,
    ) -> Result<ElementId, HostError> {
        host.create(&AVATAR)
    }

    fn update(
        &mut self,
        host: &dyn OverlayHost,
        element: ElementId,
        _key: &ActiveSetKey,
        user: &RemoteUser,
    ) -> Result<RenderOutcome, HostError> {
        paint_avatar(host, element, user)?;
        Ok(RenderOutcome::Rendered)
    }

    fn modal_content(&self, _key: &ActiveSetKey, user: &RemoteUser) -> ModalContent {
        ModalContent::titled(user.title())
            .color(user.color.clone())
            .subtitle("Editing this notebook")
    }

    fn finish_pass(
        &mut self,
        host: &dyn OverlayHost,
        _report: &PassReport,
    ) -> Result<(), HostError> {
        self.sync_chip(host)
    }

    fn chrome_hover(&self, element: ElementId) -> Option<(ModalKey, ModalContent)> {
        if self.chip != Some(element) {
            return None;
        }
        let content = self.overflow.iter().fold(
            ModalContent::titled(format!("{} more", self.overflow.len())),
            |content, user| content.line(user.title()),
        );
        Some((ModalKey::Chrome(OVERFLOW_CHIP), content))
    }

    fn teardown(&mut self, host: &dyn OverlayHost) {
        if let Some(chip) = self.chip.take() {
            host.remove(chip);
        }
        self.overflow.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::{Reconciler, ReconcilerOptions};
    use core::time::Duration;
    use nbp_core::ClientId;
    use nbp_harness::{FakeDom, named};
    use nbp_runtime::MemoryAwareness;

    fn setup(
        max: usize,
    ) -> (
        Rc<FakeDom>,
        Rc<MemoryAwareness>,
        Reconciler<RosterProjection, FakeDom>,
    ) {
        let dom = Rc::new(FakeDom::new());
        let awareness = Rc::new(MemoryAwareness::new(ClientId::new(1)));
        let projection = RosterProjection::new(awareness.clone(), NamePolicy::Fallback, max);
        let rec = Reconciler::new(Rc::clone(&dom), projection, ReconcilerOptions::default());
        (dom, awareness, rec)
    }

    #[test]
    fn local_client_is_not_listed() {
        let (dom, awareness, mut rec) = setup(3);
        awareness.set_state(ClientId::new(1), named("Me"));
        awareness.set_state(ClientId::new(7), named("Ada Lovelace"));
        rec.pass(Duration::ZERO);
        let avatars = dom.by_class("nbp-roster-avatar");
        assert_eq!(avatars.len(), 1);
        assert_eq!(dom.text(avatars[0]).as_deref(), Some("AL"));
    }

    #[test]
    fn overflow_chip_counts_hidden_users() {
        let (dom, awareness, mut rec) = setup(3);
        for n in 2..=6 {
            awareness.set_state(ClientId::new(n), named(&format!("User{n}")));
        }
        rec.pass(Duration::ZERO);
        assert_eq!(dom.by_class("nbp-roster-avatar").len(), 3);
        let chip = rec.projection().chip().unwrap();
        assert_eq!(dom.text(chip).as_deref(), Some("+2"));

        let (key, content) = rec.projection().chrome_hover(chip).unwrap();
        assert_eq!(key, ModalKey::Chrome(OVERFLOW_CHIP));
        assert_eq!(content.lines, vec!["User5".to_string(), "User6".to_string()]);

        awareness.remove_state(ClientId::new(6));
        awareness.remove_state(ClientId::new(5));
        rec.pass(Duration::ZERO);
        assert_eq!(rec.projection().chip(), None);
        assert!(dom.by_class("nbp-roster-overflow").is_empty());
    }

    #[test]
    fn unnamed_user_gets_fallback_name() {
        let (dom, awareness, mut rec) = setup(3);
        awareness.set_state(ClientId::new(42), nbp_core::PeerState::default());
        rec.pass(Duration::ZERO);
        let avatar = dom.by_class("nbp-roster-avatar")[0];
        assert_eq!(dom.node(avatar).unwrap().attribute("title"), Some("User 42"));
    }

    #[test]
    fn teardown_removes_chip() {
        let (dom, awareness, mut rec) = setup(1);
        awareness.set_state(ClientId::new(2), named("a"));
        awareness.set_state(ClientId::new(3), named("b"));
        rec.pass(Duration::ZERO);
        rec.clear();
        assert_eq!(dom.live_count(), 0);
    }
}
