//! The five search use-cases this crate exposes as CLI subcommands.
//! Grounded in `main.cpp`: `countTrailCores`, `findTrails`/`_findTrails`,
//! `countInKernelTrails`, `extendFromBruteforce`, `bruteforceInKernel`.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use sysinfo::System;
use tracing::{debug, info};

use crate::cache::TrailCoreStack;
use crate::error::TrailError;
use crate::permutation::{apply_dispersion, theta_effect};
use crate::state::LANESIZE;
use crate::trail::{Trail, TrailExtension};
use crate::tree::{GenericTreeIterator, TrailCore};
use crate::unit_sets::{ColumnCostFunction, ColumnsSet, OrbitalCostFunction, OrbitalsSet};

pub type OrbitalTreeIterator = GenericTreeIterator<OrbitalsSet, OrbitalCostFunction>;
pub type RunTreeIterator = GenericTreeIterator<ColumnsSet, ColumnCostFunction>;

/// Determines the minimum y-position orbitals may use at each z-column
/// given the parity-bare two-round core `core`, and whether `core` lies in
/// the column-parity kernel.
pub fn load_y_min(core: &TrailCore) -> (Vec<usize>, bool) {
    let parity = core.state_a.parity();
    let effect = theta_effect(parity);
    let mut y_min = vec![0usize; LANESIZE];
    let mut kernel = true;

    for (z, y_min_z) in y_min.iter_mut().enumerate() {
        let shift = LANESIZE - 1 - z;
        let odd = (parity >> shift) & 1 != 0;
        if odd {
            kernel = false;
        }
        let affected = (effect >> shift) & 1 != 0;
        if affected {
            *y_min_z = crate::state::COLUMNSIZE;
        } else if odd {
            for y in 0..crate::state::COLUMNSIZE {
                if (core.state_a.row(y) >> shift) & 1 != 0 {
                    *y_min_z = y + 1;
                    break;
                }
            }
        }
    }
    (y_min, kernel)
}

/// True iff neither endpoint state of a two-round core has a weight-one
/// column (i.e. both lie in the column-parity kernel after dispersion).
pub fn is_in_kernel(core: &TrailCore) -> bool {
    let mut sum_a = [0u32; LANESIZE];
    core.state_a.sum(&mut sum_a);
    let mut state_b = core.state_b;
    apply_dispersion(&mut state_b);
    let mut sum_b = [0u32; LANESIZE];
    state_b.sum(&mut sum_b);
    !sum_a.iter().chain(sum_b.iter()).any(|&s| s == 1)
}

fn orbital_iterator_for(node: TrailCore, max_weight: u32) -> OrbitalTreeIterator {
    let (y_min, kernel) = load_y_min(&node);
    let cache = TrailCoreStack::rooted_at(
        node.state_a,
        node.state_b,
        node.w0,
        node.w1,
        node.complete,
        node.z_period,
    );
    GenericTreeIterator::new(OrbitalsSet::new(kernel, y_min), cache, OrbitalCostFunction, max_weight)
}

/// Enumerates two-round trail cores outside the kernel, returning weight
/// histograms `(all_cores, kernel_cores)` indexed by total weight.
pub fn count_trail_cores(max_weight: u32) -> (Vec<u32>, Vec<u32>) {
    let mut counts = vec![0u32; max_weight as usize + 1];
    let mut kernel_counts = vec![0u32; max_weight as usize + 1];

    let mut run_iter: RunTreeIterator =
        GenericTreeIterator::new(ColumnsSet, TrailCoreStack::new(), ColumnCostFunction, max_weight);

    while !run_iter.is_end() {
        let node_run = run_iter.current();
        let cost_run = node_run.w0 + node_run.w1;
        if cost_run <= max_weight && node_run.complete {
            let (y_min, kernel) = load_y_min(&node_run);
            let cache = TrailCoreStack::rooted_at(
                node_run.state_a,
                node_run.state_b,
                node_run.w0,
                node_run.w1,
                node_run.complete,
                node_run.z_period,
            );
            let mut orb_iter: OrbitalTreeIterator =
                GenericTreeIterator::new(OrbitalsSet::new(kernel, y_min), cache, OrbitalCostFunction, max_weight);

            while !orb_iter.is_end() {
                let node_orb = orb_iter.current();
                let w = (node_orb.w0 + node_orb.w1) as usize;
                counts[w] += 1;
                if kernel {
                    kernel_counts[w] += 1;
                }
                orb_iter.advance();
            }
        }
        run_iter.advance();
    }

    (counts, kernel_counts)
}

fn extend_one_core(node: TrailCore, rounds: u32, max_weight: u32) -> Trail {
    let mut ext = TrailExtension::from_core(&node);
    for _ in 0..rounds.saturating_sub(2) {
        let _ = ext.extend_forward(max_weight);
    }
    for _ in 0..rounds.saturating_sub(2) {
        let _ = ext.extend_backward(max_weight);
    }
    ext.get_best_trail(rounds as usize)
}

/// Builds the orbital tree rooted at a column-run core and extends every
/// orbital-tree node to `rounds`, keeping the lowest-weight complete trail
/// found across the whole subtree. Grounded in `_findTrails`'s per-task loop
/// over `iteratorOrb`, which extends `*iteratorOrb` rather than the bare
/// column core itself.
fn extend_best_from_run_node(node_run: TrailCore, rounds: u32, max_weight: u32, orbital_budget: u32) -> Trail {
    let mut orb_iter = orbital_iterator_for(node_run, orbital_budget);
    let mut best = Trail::new();
    let mut min_weight = u32::MAX;

    while !orb_iter.is_end() {
        let node_orb = orb_iter.current();
        let candidate = extend_one_core(node_orb, rounds, max_weight);
        if candidate.len() == rounds as usize
            && candidate.total_weight > 0
            && candidate.total_weight <= max_weight
            && candidate.total_weight < min_weight
        {
            min_weight = candidate.total_weight;
            best = candidate;
        }
        orb_iter.advance();
    }

    best
}

/// Admission control: blocks the caller while the 1-minute load average
/// exceeds the machine's available parallelism, matching `findTrails`'s
/// `getloadavg` throttle.
fn wait_for_capacity(sys: &mut System) {
    let capacity = thread::available_parallelism().map(|n| n.get()).unwrap_or(1) as f64;
    loop {
        sys.refresh_all();
        let load = System::load_average().one;
        if load <= capacity {
            return;
        }
        debug!(load, capacity, "load average above capacity, waiting");
        thread::sleep(Duration::from_secs(1));
    }
}

/// Spawns one OS thread per two-round trail core with cost within budget
/// and extends it to `rounds`, keeping the lowest-weight complete trail
/// found across all of them. Grounded in `findTrails`/`_findTrails`.
pub fn find_trails(rounds: u32, max_weight: u32) -> Trail {
    let run_budget = (max_weight / rounds) * 2 + 1;
    let mut run_iter: RunTreeIterator =
        GenericTreeIterator::new(ColumnsSet, TrailCoreStack::new(), ColumnCostFunction, run_budget);

    // Skip the first node: it is always the empty trail core.
    run_iter.advance();

    let partial_results: Arc<Mutex<Vec<Trail>>> = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    let mut sys = System::new();

    while !run_iter.is_end() {
        let node_run = run_iter.current();
        if node_run.w0 + node_run.w1 <= run_budget && node_run.complete {
            wait_for_capacity(&mut sys);

            let partial_results = Arc::clone(&partial_results);
            handles.push(thread::spawn(move || {
                let trail = extend_best_from_run_node(node_run, rounds, max_weight, run_budget);
                if trail.len() != rounds as usize || trail.total_weight == 0 {
                    return;
                }
                let mut results = partial_results.lock().expect("partial results mutex poisoned");
                if results.iter().all(|t: &Trail| t.total_weight >= trail.total_weight) {
                    info!(weight = trail.total_weight, "new best trail");
                    results.push(trail);
                }
            }));
        }
        run_iter.advance();
    }

    info!(tasks = handles.len(), "dispatched extension tasks");
    for h in handles {
        let _ = h.join();
    }

    let results = partial_results.lock().expect("partial results mutex poisoned");
    results
        .iter()
        .min_by_key(|t| t.total_weight)
        .cloned()
        .unwrap_or_default()
}

/// Counts (and collects) in-kernel extensions of every two-round core,
/// returning a weight histogram of `rounds`-length in-kernel trails.
/// Matches `countInKernelTrails`, which is only meaningful at `rounds == 3`
/// (see [`TrailExtension::remove_outside_kernel`]).
pub fn count_in_kernel_trails(rounds: u32, max_weight: u32) -> (Vec<u32>, Vec<Trail>) {
    let run_budget = (max_weight / rounds) * 2 + 1;
    let mut run_iter: RunTreeIterator =
        GenericTreeIterator::new(ColumnsSet, TrailCoreStack::new(), ColumnCostFunction, run_budget);
    run_iter.advance();

    let mut stats = Vec::new();
    let mut trails = Vec::new();
    let mut in_kernel_cores = 0u32;

    while !run_iter.is_end() {
        let node_run = run_iter.current();
        if node_run.w0 + node_run.w1 <= run_budget && node_run.complete {
            let mut orb_iter = orbital_iterator_for(node_run, run_budget);
            while !orb_iter.is_end() {
                let node_orb = orb_iter.current();
                if is_in_kernel(&node_orb) {
                    in_kernel_cores += 1;

                    let mut forward = TrailExtension::from_core(&node_orb);
                    let _ = forward.extend_forward(max_weight);
                    forward.remove_outside_kernel(rounds as usize);
                    forward.get_stats(&mut stats, rounds as usize);
                    trails.extend(forward.trails);

                    let mut backward = TrailExtension::from_core(&node_orb);
                    let _ = backward.extend_backward(max_weight);
                    backward.remove_outside_kernel(rounds as usize);
                    backward.get_stats(&mut stats, rounds as usize);
                    trails.extend(backward.trails);
                }
                orb_iter.advance();
            }
        }
        run_iter.advance();
    }

    debug!(in_kernel_cores, "two-round cores found in kernel");
    (stats, trails)
}

/// Reads two-round cores from a brute-force log and extends each to
/// `rounds`, returning the lowest-weight complete trail. Grounded in
/// `extendFromBruteforce`.
pub fn extend_from_bruteforce(
    input: &mut impl BufRead,
    rounds: u32,
    max_weight: u32,
) -> std::io::Result<Trail> {
    let mut best = Trail::new();
    let mut min_weight = u32::MAX;

    while let Some(seed) = Trail::load_bruteforce(input)? {
        let mut ext = TrailExtension::from_trail(seed);
        for _ in 0..rounds.saturating_sub(2) {
            let _ = ext.extend_forward(max_weight);
        }
        for _ in 0..rounds.saturating_sub(2) {
            let _ = ext.extend_backward(max_weight);
        }
        let candidate = ext.get_best_trail(rounds as usize);

        if candidate.len() == rounds as usize
            && candidate.total_weight > 0
            && candidate.total_weight < min_weight
            && candidate.total_weight <= max_weight
        {
            min_weight = candidate.total_weight;
            best = candidate;
        }
    }

    Ok(best)
}

/// Exhaustively enumerates orbital-only (parity-bare, all-kernel) two-round
/// cores, writing each new minimum-weight in-kernel find to `out` as it is
/// discovered. Grounded in `bruteforceInKernel`.
pub fn bruteforce_in_kernel(max_weight: u32, out: &mut impl Write) -> Result<u32, TrailError> {
    let y_min = vec![0usize; LANESIZE];
    let cache = TrailCoreStack::rooted_at(
        crate::state::State::new(),
        crate::state::State::new(),
        0,
        0,
        true,
        LANESIZE as u32,
    );
    let mut orb_iter: OrbitalTreeIterator =
        GenericTreeIterator::new(OrbitalsSet::new(true, y_min), cache, OrbitalCostFunction, max_weight);

    let mut min_weight = u32::MAX;
    let mut found = 0u32;
    orb_iter.advance();

    while !orb_iter.is_end() {
        let node = orb_iter.current();
        if is_in_kernel(&node) {
            found += 1;
            let weight = node.w0 + node.w1;
            if weight < min_weight && weight <= max_weight {
                min_weight = weight;
                let mut trail = Trail::new();
                let mut state_b = node.state_b;
                apply_dispersion(&mut state_b);
                trail.append(node.state_a, node.w0);
                trail.append(state_b, node.w1);
                trail
                    .save(out)
                    .map_err(|e| TrailError::Load { path: "<out>".into(), reason: e.to_string() })?;
            }
        }
        orb_iter.advance();
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;

    #[test]
    fn load_y_min_on_empty_state_is_all_zero_and_in_kernel() {
        let node = TrailCore {
            state_a: State::new(),
            state_b: State::new(),
            w0: 0,
            w1: 0,
            complete: true,
            z_period: LANESIZE as u32,
        };
        let (y_min, kernel) = load_y_min(&node);
        assert!(kernel);
        assert!(y_min.iter().all(|&y| y == 0));
    }

    #[test]
    fn is_in_kernel_rejects_weight_one_column() {
        let mut state_a = State::new();
        state_a.set_bit(0, 0);
        let node = TrailCore {
            state_a,
            state_b: State::new(),
            w0: 1,
            w1: 0,
            complete: true,
            z_period: LANESIZE as u32,
        };
        assert!(!is_in_kernel(&node));
    }

    #[test]
    fn count_trail_cores_at_zero_weight_counts_only_the_empty_root() {
        // Budget 0 affords no unaffected-odd-column and no orbital, so the
        // only node either tree can reach is its own empty root.
        let (counts, kernel_counts) = count_trail_cores(0);
        assert_eq!(counts, vec![1]);
        assert_eq!(kernel_counts, vec![1]);
    }

    #[test]
    fn extend_from_bruteforce_on_empty_input_returns_empty_trail() {
        let mut input = std::io::Cursor::new(Vec::new());
        let best = extend_from_bruteforce(&mut input, 4, 20).unwrap();
        assert!(best.is_empty());
    }
}
