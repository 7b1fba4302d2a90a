//! Benchmarks for the active-set diff and the scoped snapshot builder.
//!
//! Run with: cargo bench -p nbp-core --bench diff_bench

use std::collections::{BTreeSet, HashMap};
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nbp_core::snapshot::build_scoped;
use nbp_core::{
    AbsolutePosition, AwarenessSnapshot, ClientId, ContainerId, ContainerScope, CursorState,
    NamePolicy, PeerState, PositionResolver, RawUser, RelativePosition, diff,
};

struct TableResolver(HashMap<String, AbsolutePosition>);

impl PositionResolver for TableResolver {
    fn resolve(&self, position: &RelativePosition) -> Option<AbsolutePosition> {
        self.0.get(position.token()).cloned()
    }
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");
    for size in [8u32, 64, 512] {
        let prev: BTreeSet<u32> = (0..size).collect();
        let curr: BTreeSet<u32> = (size / 4..size + size / 4).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(diff(&prev, &curr)));
        });
    }
    group.finish();
}

fn bench_build_scoped(c: &mut Criterion) {
    let cells = 32usize;
    let peers = 24u64;
    let mut table = HashMap::new();
    let mut states = Vec::new();
    for client in 1..=peers {
        let token = format!("pos-{client}");
        let cell = format!("cell-{}", client as usize % cells);
        table.insert(token.clone(), AbsolutePosition::new(cell.as_str(), client as usize));
        let state = PeerState::with_user(RawUser::named(format!("Peer {client}")))
            .cursor(CursorState::caret(RelativePosition::new(token)));
        states.push((ClientId::new(client), state));
    }
    let snapshot = AwarenessSnapshot::from_states(ClientId::new(0), states);
    let resolver = TableResolver(table);
    let scope = ContainerScope::AnyOf(
        (0..cells)
            .map(|i| ContainerId::new(format!("cell-{i}")))
            .collect(),
    );

    c.bench_function("build_scoped/24_peers_32_cells", |b| {
        b.iter(|| {
            black_box(build_scoped(&snapshot, &scope, &resolver, NamePolicy::Fallback))
        });
    });
}

criterion_group!(benches, bench_diff, bench_build_scoped);
criterion_main!(benches);
