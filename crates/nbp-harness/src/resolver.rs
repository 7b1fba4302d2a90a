#![forbid(unsafe_code)]

//! Table-driven [`PositionResolver`].

use std::cell::{Cell, RefCell};

use ahash::AHashMap;
use nbp_core::{AbsolutePosition, ContainerId, PositionResolver, RelativePosition};

/// Resolves tokens from a mutable lookup table. Unknown tokens fail, which
/// models anchored content that was deleted.
#[derive(Debug, Default)]
pub struct StaticResolver {
    table: RefCell<AHashMap<String, AbsolutePosition>>,
    lookups: Cell<u64>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `token` to `offset` inside `container`.
    pub fn set(&self, token: &str, container: impl Into<ContainerId>, offset: usize) {
        self.table
            .borrow_mut()
            .insert(token.to_string(), AbsolutePosition::new(container, offset));
    }

    /// Make `token` unresolvable.
    pub fn forget(&self, token: &str) {
        self.table.borrow_mut().remove(token);
    }

    /// Number of `resolve` calls so far.
    pub fn lookups(&self) -> u64 {
        self.lookups.get()
    }
}

impl PositionResolver for StaticResolver {
    fn resolve(&self, position: &RelativePosition) -> Option<AbsolutePosition> {
        self.lookups.set(self.lookups.get() + 1);
        self.table.borrow().get(position.token()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_token_fails() {
        let r = StaticResolver::new();
        r.set("a", "cell-1", 4);
        assert_eq!(
            r.resolve(&RelativePosition::new("a")),
            Some(AbsolutePosition::new("cell-1", 4))
        );
        r.forget("a");
        assert_eq!(r.resolve(&RelativePosition::new("a")), None);
        assert_eq!(r.lookups(), 2);
    }
}
