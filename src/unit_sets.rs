//! Orbital and column unit sets: total order, first-child/sibling rules,
//! cost increments, and z-canonicity tests. Grounded in `MyTree.h`/
//! `MyTree.cpp` (`OrbitalsSet`, `ColumnsSet`).

use crate::cache::TrailCoreStack;
use crate::error::EndOfSet;
use crate::state::LANESIZE;
use crate::tree::{CostFunction, Order, UnitSet};
use crate::units::{Column, Orbital};

/// The set of orbitals and the order relation `[z, y0, y1]` among them.
pub struct OrbitalsSet {
    /// Whether these orbitals generate states in the column-parity kernel.
    pub kernel: bool,
    /// Minimum y-coordinate of the lower bit of an orbital, per z-column.
    pub y_min: Vec<usize>,
}

impl OrbitalsSet {
    pub fn new(kernel: bool, y_min: Vec<usize>) -> Self {
        Self { kernel, y_min }
    }
}

impl Default for OrbitalsSet {
    fn default() -> Self {
        Self {
            kernel: true,
            y_min: vec![0; LANESIZE],
        }
    }
}

impl UnitSet for OrbitalsSet {
    type Unit = Orbital;

    fn first_child(&self, unit_list: &[Orbital]) -> Result<Orbital, EndOfSet> {
        let mut new_orbital = Orbital::default();
        match unit_list.last() {
            None => new_orbital.first(&self.y_min)?,
            Some(last) => new_orbital.successor_of(last, &self.y_min)?,
        }
        Ok(new_orbital)
    }

    fn iterate(&self, _unit_list: &[Orbital], current: &mut Orbital) -> Result<(), EndOfSet> {
        current.next(&self.y_min)
    }

    fn compare(&self, first: &Orbital, second: &Orbital) -> Order {
        if first.z != second.z {
            return if first.z < second.z { Order::Smaller } else { Order::Greater };
        }
        if first.y0 != second.y0 {
            return if first.y0 < second.y0 { Order::Smaller } else { Order::Greater };
        }
        if first.y1 != second.y1 {
            return if first.y1 < second.y1 { Order::Smaller } else { Order::Greater };
        }
        Order::Equal
    }

    fn is_canonical(&self, orbital_list: &[Orbital], cache: &mut TrailCoreStack) -> bool {
        cache.node_period = LANESIZE as u32;

        if self.kernel {
            if orbital_list[0].z != 0 {
                return false;
            }
            let mut last_z = 0usize;
            for i in 0..orbital_list.len() {
                let z = orbital_list[i].z;
                if z != 0 && z > last_z {
                    last_z = z;
                    match self.compare_translation(orbital_list, i, z) {
                        Order::Smaller => return false,
                        Order::Equal => {
                            cache.node_period = z as u32;
                            break;
                        }
                        Order::Greater => {}
                    }
                }
            }
            true
        } else {
            if cache.root_period == LANESIZE as u32 {
                return true;
            }
            let mut z = cache.root_period as usize;
            while z < LANESIZE {
                let split = orbital_list.iter().position(|o| o.z >= z).unwrap_or(orbital_list.len());
                match self.compare_translation(orbital_list, split, z) {
                    Order::Smaller => return false,
                    Order::Equal => {
                        cache.node_period = z as u32;
                        break;
                    }
                    Order::Greater => {}
                }
                z += cache.root_period as usize;
            }
            true
        }
    }
}

impl OrbitalsSet {
    /// Compares `orbital_list` against its translation by `z` (splitting at
    /// `split`), lexicographically, stopping at the first non-equal
    /// position. `Equal` means the list is z-periodic with period `z`.
    fn compare_translation(&self, orbital_list: &[Orbital], split: usize, z: usize) -> Order {
        let tau = self.translate(orbital_list, split, z);
        for k in 0..orbital_list.len() {
            match self.compare(&tau[k], &orbital_list[k]) {
                Order::Equal => continue,
                other => return other,
            }
        }
        Order::Equal
    }

    fn translate(&self, orbital_list: &[Orbital], split: usize, z: usize) -> Vec<Orbital> {
        let mut tau = Vec::with_capacity(orbital_list.len());
        for orbital in &orbital_list[split..] {
            let mut o = *orbital;
            o.z -= z;
            tau.push(o);
        }
        for orbital in &orbital_list[..split] {
            let mut o = *orbital;
            o.z = o.z + LANESIZE - z;
            tau.push(o);
        }
        tau
    }
}

/// Cost function for orbitals: each orbital costs 4 (2 to each of w0, w1).
pub struct OrbitalCostFunction;

impl CostFunction<Orbital> for OrbitalCostFunction {
    fn cost(&self, cache: &TrailCoreStack) -> u32 {
        cache.w0() + cache.w1()
    }

    fn affordable(
        &self,
        _unit_list: &[Orbital],
        cache: &TrailCoreStack,
        _new_unit: &Orbital,
        max_cost: u32,
    ) -> bool {
        self.cost(cache) + 4 <= max_cost
    }
}

/// Allowed values for unaffected-odd columns (UOC).
pub const UO_VALUES: [u32; 4] = [0x1, 0x2, 0x4, 0x8];
/// Allowed values for affected-even columns (AEC).
pub const AE_VALUES: [u32; 8] = [0x0, 0x3, 0x5, 0x6, 0x9, 0xA, 0xC, 0xF];

/// The set of column assignments and the order relation `[affected, z, value]`.
#[derive(Default)]
pub struct ColumnsSet;

impl ColumnsSet {
    fn check_entanglement(&self, unit_list: &[Column], current: &Column) -> bool {
        unit_list
            .iter()
            .any(|u| u.z == current.z && !(current.affected && u.affected))
    }
}

impl UnitSet for ColumnsSet {
    type Unit = Column;

    fn first_child(&self, unit_list: &[Column]) -> Result<Column, EndOfSet> {
        let mut new_column = Column::default();
        match unit_list.last() {
            None => {
                new_column.z = 0;
                new_column.odd = true;
                new_column.affected = false;
                new_column.value = UO_VALUES[0];
                new_column.entangled = false;
            }
            Some(last) if !last.affected && last.odd => {
                new_column.affected = true;
                new_column.odd = false;
                new_column.z = (last.z + 1) % LANESIZE;
                new_column.value = AE_VALUES[0];
                new_column.entangled = self.check_entanglement(unit_list, &new_column);
            }
            Some(last) if last.affected && !last.odd => {
                if last.z == 0 {
                    return Err(EndOfSet);
                }
                new_column.affected = false;
                new_column.odd = true;
                new_column.value = UO_VALUES[0];
                if last.value & 1 != 0 {
                    if last.z + 1 >= LANESIZE {
                        return Err(EndOfSet);
                    }
                    new_column.z = last.z + 1;
                    new_column.entangled = false;
                } else {
                    new_column.z = last.z;
                    new_column.entangled = true;
                }
            }
            Some(_) => return Err(EndOfSet),
        }
        Ok(new_column)
    }

    fn iterate(&self, unit_list: &[Column], current: &mut Column) -> Result<(), EndOfSet> {
        if !current.affected && current.odd {
            if current.entangled {
                return Err(EndOfSet);
            }
            if current.index < UO_VALUES.len() - 1 {
                current.index += 1;
                current.value = UO_VALUES[current.index];
            } else {
                return Err(EndOfSet);
            }
        } else if current.affected && !current.odd {
            if current.index < AE_VALUES.len() - 1 {
                current.index += 1;
                current.value = AE_VALUES[current.index];
            } else {
                return Err(EndOfSet);
            }
        }

        if unit_list.is_empty() && current.z > 0 {
            return Err(EndOfSet);
        }
        Ok(())
    }

    fn compare(&self, first: &Column, second: &Column) -> Order {
        if !first.affected && second.affected {
            return Order::Smaller;
        }
        if first.affected == second.affected {
            if first.z != second.z {
                return if first.z < second.z { Order::Smaller } else { Order::Greater };
            }
            if first.value != second.value {
                return if first.value < second.value {
                    Order::Smaller
                } else {
                    Order::Greater
                };
            }
            return Order::Equal;
        }
        Order::Greater
    }

    fn is_canonical(&self, unit_list: &[Column], cache: &mut TrailCoreStack) -> bool {
        cache.node_period = LANESIZE as u32;

        if cache.root_period == LANESIZE as u32 {
            return true;
        }
        if unit_list[0].z != 0 {
            return false;
        }
        if unit_list.last().expect("non-empty by construction").odd {
            return true;
        }

        let mut last_z = 0usize;
        for i in 0..unit_list.len() {
            let z = unit_list[i].z;
            if z != 0 && z > last_z {
                last_z = z;
                let tau = self.translate(unit_list, i, z);
                let mut j = 0;
                while j < unit_list.len() {
                    match self.compare(&tau[j], &unit_list[j]) {
                        Order::Smaller => return false,
                        Order::Greater => break,
                        Order::Equal => j += 1,
                    }
                }
                if j == unit_list.len() {
                    cache.node_period = z as u32;
                    break;
                }
            }
        }
        true
    }
}

impl ColumnsSet {
    fn translate(&self, unit_list: &[Column], split: usize, z: usize) -> Vec<Column> {
        let mut tau = Vec::with_capacity(unit_list.len());
        for column in &unit_list[split..] {
            let mut c = *column;
            c.z = (c.z + LANESIZE - z) % LANESIZE;
            tau.push(c);
        }
        for column in &unit_list[..split] {
            let mut c = *column;
            c.z = (c.z + LANESIZE - z) % LANESIZE;
            tau.push(c);
        }
        tau
    }
}

/// Cost function for columns: affected units cost 4; unaffected (UOC) units
/// cost 2 unless entangled with the previous column (same z), in which case
/// they cost 0.
pub struct ColumnCostFunction;

impl CostFunction<Column> for ColumnCostFunction {
    fn cost(&self, cache: &TrailCoreStack) -> u32 {
        cache.w0() + cache.w1()
    }

    fn affordable(
        &self,
        unit_list: &[Column],
        cache: &TrailCoreStack,
        new_unit: &Column,
        max_cost: u32,
    ) -> bool {
        let mut gamma = self.cost(cache);
        if new_unit.affected {
            gamma += 4;
        } else if new_unit.odd {
            if unit_list.last().is_none_or(|last| new_unit.z != last.z) {
                gamma += 2;
            }
        } else {
            return false;
        }
        gamma <= max_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbitals_set_with_saturated_ymin_is_empty() {
        let set = OrbitalsSet::new(true, vec![3; LANESIZE]);
        assert!(set.first_child(&[]).is_err());
    }

    #[test]
    fn orbital_kernel_canonicity_accepts_z0_and_z8_pair() {
        let set = OrbitalsSet::default();
        let mut cache = TrailCoreStack::new();
        let list = vec![
            Orbital { y0: 0, y1: 1, z: 0 },
            Orbital { y0: 0, y1: 1, z: 8 },
        ];
        assert!(set.is_canonical(&list, &mut cache));
    }

    #[test]
    fn orbital_kernel_canonicity_rejects_nonzero_start() {
        let set = OrbitalsSet::default();
        let mut cache = TrailCoreStack::new();
        let list = vec![
            Orbital { y0: 0, y1: 1, z: 4 },
            Orbital { y0: 0, y1: 1, z: 12 },
        ];
        assert!(!set.is_canonical(&list, &mut cache));
    }

    #[test]
    fn columns_set_first_child_is_uoc_at_zero() {
        let set = ColumnsSet;
        let c = set.first_child(&[]).unwrap();
        assert_eq!(c.z, 0);
        assert!(c.odd && !c.affected);
        assert_eq!(c.value, 0x1);
    }

    #[test]
    fn columns_set_uoc_followed_by_aec_advances_z() {
        let set = ColumnsSet;
        let uoc = set.first_child(&[]).unwrap();
        let aec = set.first_child(&[uoc]).unwrap();
        assert!(aec.affected && !aec.odd);
        assert_eq!(aec.z, 1);
    }

    #[test]
    fn columns_set_aec_at_z0_with_y0_bit_ends_set() {
        let set = ColumnsSet;
        let aec = Column {
            z: 0,
            value: 0x3,
            odd: false,
            affected: true,
            entangled: false,
            index: 1,
        };
        assert!(set.first_child(&[aec]).is_err());
    }
}
