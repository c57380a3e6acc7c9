//! The generic depth-first tree iterator over ordered unit lists. Grounded
//! in `Tree.h`'s `GenericTreeIterator` template, expressed here as a
//! capability trait (`UnitSet`) the iterator is generic over, per the
//! reimplementation guidance of spec.md §9.

use crate::cache::TrailCoreStack;
use crate::error::EndOfSet;
use crate::state::State;

/// Result of comparing two units under a unit set's total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Equal,
    Smaller,
    Greater,
}

/// A unit set defines a total order on units, first-child/sibling rules, and
/// a z-canonicity test.
pub trait UnitSet {
    type Unit: Clone;

    fn first_child(&self, unit_list: &[Self::Unit]) -> Result<Self::Unit, EndOfSet>;
    fn iterate(&self, unit_list: &[Self::Unit], current: &mut Self::Unit) -> Result<(), EndOfSet>;
    fn compare(&self, a: &Self::Unit, b: &Self::Unit) -> Order;
    fn is_canonical(&self, unit_list: &[Self::Unit], cache: &mut TrailCoreStack) -> bool;
}

/// A cost function prunes branches whose weight would exceed the budget.
pub trait CostFunction<U> {
    fn cost(&self, cache: &TrailCoreStack) -> u32;
    fn affordable(&self, unit_list: &[U], cache: &TrailCoreStack, new_unit: &U, max_cost: u32) -> bool;
}

/// Pushes a specific unit kind onto the incremental cache. `TrailCoreStack`
/// implements this for both `Orbital` and `Column`.
pub trait Push<U> {
    fn push_unit(&mut self, unit: &U);
}

/// A snapshot of the current node: a two-round trail core.
#[derive(Debug, Clone, Copy)]
pub struct TrailCore {
    pub state_a: State,
    pub state_b: State,
    pub w0: u32,
    pub w1: u32,
    pub complete: bool,
    pub z_period: u32,
}

impl TrailCore {
    fn from_cache(cache: &TrailCoreStack) -> Self {
        Self {
            state_a: cache.state_a(),
            state_b: cache.state_b(),
            w0: cache.w0(),
            w1: cache.w1(),
            complete: cache.complete(),
            z_period: cache.node_period,
        }
    }
}

/// A depth-first cursor over the tree whose nodes are ordered unit lists
/// built from `S::Unit`s, cut by a weight budget and z-canonicity.
pub struct GenericTreeIterator<S, C>
where
    S: UnitSet,
    C: CostFunction<S::Unit>,
    TrailCoreStack: Push<S::Unit>,
{
    unit_set: S,
    unit_list: Vec<S::Unit>,
    cache: TrailCoreStack,
    cost_function: C,
    cost: Vec<u32>,
    max_cost: u32,
    end: bool,
    initialized: bool,
    empty: bool,
}

impl<S, C> GenericTreeIterator<S, C>
where
    S: UnitSet,
    C: CostFunction<S::Unit>,
    TrailCoreStack: Push<S::Unit>,
{
    pub fn new(unit_set: S, cache: TrailCoreStack, cost_function: C, max_cost: u32) -> Self {
        Self {
            unit_set,
            unit_list: Vec::new(),
            cache,
            cost_function,
            cost: Vec::new(),
            max_cost,
            end: false,
            initialized: false,
            empty: true,
        }
    }

    /// True iff the tree contains no reachable node. Forces initialization,
    /// unlike [`Self::is_end`].
    pub fn is_empty(&mut self) -> bool {
        if !self.initialized {
            self.initialize();
        }
        self.empty
    }

    /// True iff the walk has exhausted the tree. Does *not* initialize: the
    /// iterator starts positioned on the empty root, and a loop of the form
    /// `while !is_end() { ...; advance() }` sees that root as its first node,
    /// exactly as the C++ `isEnd()` this mirrors never calls `initialize()`.
    pub fn is_end(&self) -> bool {
        self.end
    }

    /// Moves to the next node, pre-order. The first call descends to the
    /// first child (equivalent to the reference's first `operator++`, which
    /// triggers `initialize()`); later calls walk forward.
    pub fn advance(&mut self) {
        if !self.initialized {
            self.initialize();
        } else if !self.end && !self.next() {
            self.end = true;
        }
    }

    /// Snapshots the current cache as a trail-core value. Before the first
    /// [`Self::advance`], this is the empty root node.
    pub fn current(&self) -> TrailCore {
        TrailCore::from_cache(&self.cache)
    }

    fn initialize(&mut self) {
        if self.to_child() {
            self.end = false;
            self.empty = false;
        } else {
            self.end = true;
            self.empty = true;
        }
        self.initialized = true;
    }

    fn next(&mut self) -> bool {
        if self.to_child() {
            return true;
        }
        loop {
            if self.to_sibling() {
                return true;
            }
            if !self.to_parent() {
                return false;
            }
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn to_child(&mut self) -> bool {
        let new_unit = match self.unit_set.first_child(&self.unit_list) {
            Ok(u) => u,
            Err(EndOfSet) => return false,
        };
        if !self.can_afford(&new_unit) {
            return false;
        }
        self.push(new_unit);
        if *self.cost.last().unwrap() <= self.max_cost && self.is_canonical() {
            return true;
        }
        if self.iterate_highest_unit() {
            return true;
        }
        self.pop();
        false
    }

    #[allow(clippy::wrong_self_convention)]
    fn to_sibling(&mut self) -> bool {
        if self.unit_list.is_empty() {
            false
        } else {
            self.iterate_highest_unit()
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn to_parent(&mut self) -> bool {
        if self.unit_list.is_empty() {
            false
        } else {
            self.pop();
            true
        }
    }

    fn iterate_highest_unit(&mut self) -> bool {
        let mut last_unit = self.unit_list.last().expect("unit_list is non-empty").clone();
        self.pop();
        loop {
            loop {
                match self.unit_set.iterate(&self.unit_list, &mut last_unit) {
                    Ok(()) => {}
                    Err(EndOfSet) => {
                        self.push_dummy(last_unit);
                        return false;
                    }
                }
                if self.can_afford(&last_unit) {
                    break;
                }
            }
            self.push(last_unit.clone());
            if *self.cost.last().unwrap() <= self.max_cost && self.is_canonical() {
                return true;
            }
            self.pop();
        }
    }

    fn push(&mut self, new_unit: S::Unit) {
        self.cache.push_unit(&new_unit);
        self.unit_list.push(new_unit);
        self.cost.push(self.cost_function.cost(&self.cache));
    }

    fn push_dummy(&mut self, new_unit: S::Unit) {
        self.cache.push_dummy();
        self.unit_list.push(new_unit);
        self.cost.push(0);
    }

    fn pop(&mut self) {
        if self.unit_list.pop().is_some() {
            self.cache.pop();
            self.cost.pop();
        }
    }

    fn is_canonical(&mut self) -> bool {
        self.unit_set.is_canonical(&self.unit_list, &mut self.cache)
    }

    fn can_afford(&self, new_unit: &S::Unit) -> bool {
        self.cost_function
            .affordable(&self.unit_list, &self.cache, new_unit, self.max_cost)
    }
}
