use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use keccak_trail_search::permutation::theta_compatible_states;
use keccak_trail_search::state::State;
use keccak_trail_search::usecases::count_trail_cores;

fn bench_theta_compatible_states(c: &mut Criterion) {
    let mut state = State::new();
    state.set_bit(0, 0);
    state.set_bit(1, 0);
    state.set_bit(2, 5);

    c.bench_function("theta_compatible_states weight<=12", |b| {
        b.iter(|| theta_compatible_states(black_box(&state), 1, 12))
    });
}

fn bench_count_trail_cores(c: &mut Criterion) {
    c.bench_function("count_trail_cores weight<=10", |b| {
        b.iter(|| count_trail_cores(black_box(10)))
    });
}

criterion_group!(benches, bench_theta_compatible_states, bench_count_trail_cores);
criterion_main!(benches);
