//! Property-based invariant tests for the active-set diff and identity rules.
//!
//! 1. `to_create`, `to_update`, `to_remove` partition `previous ∪ current`
//! 2. Applying the diff to `previous` yields exactly `current`
//! 3. Name colors are deterministic and always drawn from the palette
//! 4. Initials are never empty

use std::collections::BTreeSet;

use nbp_core::diff;
use nbp_core::identity::{PALETTE, initials, name_color};
use proptest::prelude::*;

fn key_set() -> impl Strategy<Value = BTreeSet<u16>> {
    proptest::collection::btree_set(0u16..64, 0..32)
}

proptest! {
    #[test]
    fn diff_partitions_union(prev in key_set(), curr in key_set()) {
        let d = diff(&prev, &curr);
        let mut seen = BTreeSet::new();
        for k in d.to_create.iter().chain(&d.to_update).chain(&d.to_remove) {
            prop_assert!(seen.insert(*k), "key {} appears in two partitions", k);
        }
        let union: BTreeSet<u16> = prev.union(&curr).copied().collect();
        prop_assert_eq!(seen, union);
    }

    #[test]
    fn applying_diff_reaches_current(prev in key_set(), curr in key_set()) {
        let d = diff(&prev, &curr);
        let mut live = prev.clone();
        for k in &d.to_remove {
            live.remove(k);
        }
        for k in &d.to_create {
            prop_assert!(live.insert(*k));
        }
        prop_assert_eq!(live, curr);
    }

    #[test]
    fn color_is_deterministic(name in "\\PC{0,24}") {
        let first = name_color(&name);
        let second = name_color(&name);
        prop_assert_eq!(first, second);
        prop_assert!(PALETTE.contains(&first));
    }

    #[test]
    fn initials_never_empty(name in "\\PC{0,24}") {
        prop_assert!(!initials(&name).is_empty());
    }
}
