//! Property-based invariant tests for label decay and frame coalescing.
//!
//! 1. At most one outstanding deadline per key, whatever the op sequence
//! 2. A key is reported hidden at most once per `touch`
//! 3. No key is hidden while its latest deadline is still in the future
//! 4. Any burst of requests between two frames yields exactly one frame

use std::collections::BTreeMap;
use std::time::Duration;

use nbp_runtime::{DecayScheduler, DirtyReasons, FrameScheduler, LabelPhase};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Touch(u8),
    Pin(u8),
    Unpin(u8),
    Remove(u8),
    Advance(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..6).prop_map(Op::Touch),
        1 => (0u8..6).prop_map(Op::Pin),
        1 => (0u8..6).prop_map(Op::Unpin),
        1 => (0u8..6).prop_map(Op::Remove),
        4 => (0u16..900).prop_map(Op::Advance),
    ]
}

proptest! {
    #[test]
    fn decay_never_double_fires(ops in proptest::collection::vec(op(), 1..200)) {
        let interval = Duration::from_millis(500);
        let mut decay = DecayScheduler::new(interval);
        let mut now = Duration::ZERO;
        // Model: latest deadline per key and whether it already fired.
        let mut armed: BTreeMap<u8, Duration> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Touch(k) => {
                    decay.touch(&k, now);
                    if decay.phase(&k) != Some(LabelPhase::Visible) {
                        armed.insert(k, now + interval);
                    }
                }
                Op::Pin(k) => {
                    decay.pin(&k);
                    armed.remove(&k);
                }
                Op::Unpin(k) => {
                    let was_pinned = decay.phase(&k) == Some(LabelPhase::Visible);
                    decay.unpin(&k, now);
                    if was_pinned {
                        armed.insert(k, now + interval);
                    }
                }
                Op::Remove(k) => {
                    decay.remove(&k);
                    armed.remove(&k);
                }
                Op::Advance(ms) => {
                    now += Duration::from_millis(u64::from(ms));
                    let fired = decay.tick(now);
                    for k in &fired {
                        let deadline = armed.remove(k);
                        prop_assert!(deadline.is_some(), "key {} fired without a timer", k);
                        prop_assert!(deadline.is_some_and(|d| d <= now), "key {} fired early", k);
                    }
                    for (k, deadline) in &armed {
                        prop_assert!(*deadline > now, "key {} missed its deadline", k);
                    }
                }
            }
            prop_assert_eq!(decay.pending_timers(), armed.len());
            prop_assert!(decay.pending_timers() <= decay.len());
        }
    }

    #[test]
    fn burst_between_frames_runs_once(bursts in proptest::collection::vec(1usize..20, 1..20)) {
        let frames = FrameScheduler::new();
        for burst in &bursts {
            let scheduled = (0..*burst)
                .filter(|_| frames.request(DirtyReasons::AWARENESS))
                .count();
            prop_assert_eq!(scheduled, 1);
            prop_assert!(frames.begin_frame().is_some());
        }
        prop_assert_eq!(frames.frames(), bursts.len() as u64);
        let total: usize = bursts.iter().sum();
        prop_assert_eq!(frames.requests(), total as u64);
    }
}
