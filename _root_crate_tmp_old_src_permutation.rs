//! The linear propagation layer: θ-effect, dispersion, and θ-branching.
//!
//! Grounded in `Permutation.h`/`Permutation.cpp` of the reference tool. The
//! θ-effect here is the differential-propagation variant (rotation pattern
//! `0x13`), not linear Keccak θ.

use crate::error::TrailError;
use crate::state::{COLUMNSIZE, LANESIZE, State};

/// Cyclically rotates a 16-bit value right by `dist` bits.
fn ror16(value: u32, dist: u32) -> u32 {
    let mask = (1u32 << LANESIZE) - 1;
    ((value >> dist) | (value << (LANESIZE as u32 - dist))) & mask
}

/// The θ-effect derived from a parity profile by rotation pattern `0x13`:
/// `effect = ror(parity,1) ^ ror(parity,2) ^ ror(parity,5)`.
pub fn theta_effect(parity: u16) -> u16 {
    let p = parity as u32;
    (ror16(p, 1) ^ ror16(p, 2) ^ ror16(p, 5)) as u16
}

/// Applies θ to `state` using its own parity-derived effect.
pub fn apply_theta(state: &mut State) {
    let effect = theta_effect(state.parity());
    apply_theta_with_effect(state, effect);
}

/// Applies a given θ effect (not necessarily the state's own) to `state`.
pub fn apply_theta_with_effect(state: &mut State, effect: u16) {
    for y in 0..COLUMNSIZE {
        state.set_row(y, state.row(y) ^ effect);
    }
}

/// Cyclically rotates the row index (row 0 ← old row 1, ...) then rotates
/// rows 1, 2, 3 right by 10, 3, 14 z-positions respectively.
pub fn apply_dispersion(state: &mut State) {
    let tmp = state.row(0);
    state.set_row(0, state.row(1));
    state.set_row(1, state.row(2));
    state.set_row(2, state.row(3));
    state.set_row(3, tmp);

    state.rotate_row(1, 10);
    state.rotate_row(2, 3);
    state.rotate_row(3, 14);
}

/// Undoes [`apply_dispersion`].
pub fn apply_inverse_dispersion(state: &mut State) {
    state.rotate_row(1, (LANESIZE - 10) as u32);
    state.rotate_row(2, (LANESIZE - 3) as u32);
    state.rotate_row(3, (LANESIZE - 14) as u32);

    let tmp = state.row(3);
    state.set_row(3, state.row(2));
    state.set_row(2, state.row(1));
    state.set_row(1, state.row(0));
    state.set_row(0, tmp);
}

/// Given a state S at the end of a round, produce all states S' reachable by
/// some θ-branching-compatible effect, filtered to Hamming weight in
/// `[min_weight, max_weight]`.
///
/// Implements the two branchings of §4.6: parity branching (columns with ≥2
/// active cells may flip the modified effect's corresponding bit) and effect
/// branching (the cells that cancel on this round, enumerated by the
/// sum/parity table of §4.6).
pub fn theta_compatible_states(
    state: &State,
    min_weight: u32,
    max_weight: u32,
) -> Result<Vec<State>, TrailError> {
    let mut compatible = Vec::new();
    if max_weight == 0 {
        return Ok(compatible);
    }
    if min_weight > max_weight {
        return Ok(compatible);
    }
    if max_weight > 100 {
        return Err(TrailError::MaxWeightTooLarge(max_weight));
    }

    let mut sum = [0u32; LANESIZE];
    state.sum(&mut sum);

    let mut relevant_columns = Vec::new();
    for (i, &s) in sum.iter().enumerate() {
        if s >= 2 {
            relevant_columns.push((2 * LANESIZE - i - 2) % LANESIZE);
        }
    }

    let effect = theta_effect(state.parity());
    for i in 0u32..(1u32 << relevant_columns.len()) {
        let mut modified_effect = effect;
        for (j, &col) in relevant_columns.iter().enumerate() {
            if (i >> j) & 1 != 0 {
                modified_effect ^= 1 << col;
            }
        }

        let mut effect_branching = Vec::with_capacity(256);
        recur_theta_compatible_states(*state, &mut effect_branching, modified_effect, &sum, 0);

        for mut candidate in effect_branching {
            apply_theta_with_effect(&mut candidate, modified_effect);
            let w = candidate.hamming_weight();
            if w >= min_weight && w <= max_weight {
                compatible.push(candidate);
            }
        }
    }

    Ok(compatible)
}

/// Recursive helper for effect branching (§4.6), only used by
/// [`theta_compatible_states`].
fn recur_theta_compatible_states(
    state: State,
    effect_branching: &mut Vec<State>,
    effect: u16,
    sum: &[u32; LANESIZE],
    col_index: usize,
) {
    if col_index >= LANESIZE {
        effect_branching.push(state);
        return;
    }

    let sum_col = sum[col_index];
    let int_next_col_index = (2 * LANESIZE - col_index - 2) % LANESIZE;
    let int_col_index = (int_next_col_index + 1) % LANESIZE;

    let effect = effect as u32;
    if (effect >> int_col_index) & 1 != 0 && sum_col >= 2 {
        let mut diff_possible = false;
        let mut pair_possible = false;
        let mut trip_possible = false;
        let mut same_possible = false;

        if (effect >> int_next_col_index) & 1 != 0 {
            match sum_col {
                2 => diff_possible = true,
                3 => {
                    diff_possible = true;
                    pair_possible = true;
                    same_possible = true;
                }
                4 => {
                    diff_possible = true;
                    pair_possible = true;
                    trip_possible = true;
                }
                _ => unreachable!("COLUMNSIZE == 4"),
            }
        } else {
            match sum_col {
                2 => same_possible = true,
                3 => diff_possible = true,
                4 => {
                    diff_possible = true;
                    pair_possible = true;
                    same_possible = true;
                }
                _ => unreachable!("COLUMNSIZE == 4"),
            }
        }

        // No cancellation is always possible.
        let mut copy = state;
        copy.reset_column(0, col_index);
        recur_theta_compatible_states(copy, effect_branching, effect as u16, sum, col_index + 1);

        if same_possible {
            recur_theta_compatible_states(state, effect_branching, effect as u16, sum, col_index + 1);
        }
        if diff_possible {
            for i in 0..COLUMNSIZE {
                if (state.row(i) >> int_col_index) & 1 != 0 {
                    let mut copy = state;
                    copy.reset_column(1 << i, col_index);
                    recur_theta_compatible_states(
                        copy,
                        effect_branching,
                        effect as u16,
                        sum,
                        col_index + 1,
                    );
                }
            }
        }
        if pair_possible {
            for i in 0..COLUMNSIZE - 1 {
                if (state.row(i) >> int_col_index) & 1 != 0 {
                    for j in (i + 1)..COLUMNSIZE {
                        if (state.row(j) >> int_col_index) & 1 != 0 {
                            let mut copy = state;
                            copy.reset_column((1 << i) | (1 << j), col_index);
                            recur_theta_compatible_states(
                                copy,
                                effect_branching,
                                effect as u16,
                                sum,
                                col_index + 1,
                            );
                        }
                    }
                }
            }
        }
        if trip_possible {
            for i in 0..COLUMNSIZE {
                if (state.row(i) >> int_col_index) & 1 != 0 {
                    let mut copy = state;
                    copy.unset_column(1 << i, col_index);
                    recur_theta_compatible_states(
                        copy,
                        effect_branching,
                        effect as u16,
                        sum,
                        col_index + 1,
                    );
                }
            }
        }
    } else {
        recur_theta_compatible_states(state, effect_branching, effect as u16, sum, col_index + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theta_effect_on_single_bit() {
        // parity = 0x0001 -> effect = 0x8000 ^ 0x4000 ^ 0x0800 = 0xC800
        assert_eq!(theta_effect(0x0001), 0xC800);
    }

    #[test]
    fn empty_state_theta_effect_is_zero() {
        assert_eq!(theta_effect(0), 0);
    }

    #[test]
    fn dispersion_inverse_roundtrip() {
        let mut s = State::new();
        s.set_bit(0, 3);
        s.set_bit(2, 9);
        let original = s;
        apply_dispersion(&mut s);
        apply_inverse_dispersion(&mut s);
        assert_eq!(s, original);
    }

    #[test]
    fn single_bit_dispersion_matches_reference() {
        let mut s = State::new();
        s.set_bit(0, 0);
        apply_dispersion(&mut s);
        assert_eq!(s.row(0), 0);
        assert_eq!(s.row(1), 0);
        assert_eq!(s.row(2), 0);
        let mut expect = State::new();
        expect.set_bit(0, 0);
        expect.rotate_row(0, 14);
        assert_eq!(s.row(3), expect.row(0));
    }

    #[test]
    fn theta_compatible_states_zero_max_weight_is_empty() {
        let s = State::new();
        let result = theta_compatible_states(&s, 1, 0).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn theta_compatible_states_rejects_oversized_max_weight() {
        let s = State::new();
        assert!(theta_compatible_states(&s, 1, 101).is_err());
    }

    #[test]
    fn theta_compatible_states_weight_filter_is_respected() {
        let mut s = State::new();
        s.set_bit(0, 0);
        s.set_bit(1, 0);
        let result = theta_compatible_states(&s, 1, 8).unwrap();
        for candidate in &result {
            let w = candidate.hamming_weight();
            assert!((1..=8).contains(&w));
        }
        assert!(!result.is_empty());
    }
}


