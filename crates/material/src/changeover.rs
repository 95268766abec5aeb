//! Changeover cost model: a fixed symmetric lookup keyed by material family.

use prodman_core::MaterialFamily;
use serde::{Deserialize, Serialize};

/// Estimated minutes to switch a machine between material families.
///
/// Deterministic for a given (from, to) pair, symmetric, and zero on the
/// diagonal. Pairs involving a family outside the table fall back to
/// `default_cost`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChangeoverMatrix {
    default_cost: u32,
}

impl Default for ChangeoverMatrix {
    fn default() -> Self {
        Self { default_cost: 60 }
    }
}

impl ChangeoverMatrix {
    /// The matrix with the standard default cost for unlisted pairs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the cost applied to pairs outside the table.
    pub fn with_default_cost(mut self, minutes: u32) -> Self {
        self.default_cost = minutes;
        self
    }

    /// Cost for unlisted pairs.
    pub fn default_cost(&self) -> u32 {
        self.default_cost
    }

    /// Changeover cost in minutes between two families.
    pub fn cost_between(&self, from: &MaterialFamily, to: &MaterialFamily) -> u32 {
        use MaterialFamily::*;

        if from == to {
            return 0;
        }
        match (from, to) {
            (Steel, Aluminum) | (Aluminum, Steel) => 30,
            (Steel, StainlessSteel) | (StainlessSteel, Steel) => 45,
            (Steel, Copper) | (Copper, Steel) => 60,
            (Aluminum, StainlessSteel) | (StainlessSteel, Aluminum) => 40,
            (Aluminum, Copper) | (Copper, Aluminum) => 35,
            (StainlessSteel, Copper) | (Copper, StainlessSteel) => 50,
            _ => self.default_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MaterialFamily::*;

    #[test]
    fn diagonal_is_zero() {
        let m = ChangeoverMatrix::new();
        for family in [Steel, Aluminum, StainlessSteel, Copper] {
            assert_eq!(m.cost_between(&family, &family), 0);
        }
        let other = Other("TITANIUM".into());
        assert_eq!(m.cost_between(&other, &other), 0);
    }

    #[test]
    fn table_is_symmetric() {
        let m = ChangeoverMatrix::new();
        let families = [Steel, Aluminum, StainlessSteel, Copper];
        for a in &families {
            for b in &families {
                assert_eq!(m.cost_between(a, b), m.cost_between(b, a));
            }
        }
    }

    #[test]
    fn known_pairs_match_the_table() {
        let m = ChangeoverMatrix::new();
        assert_eq!(m.cost_between(&Steel, &Aluminum), 30);
        assert_eq!(m.cost_between(&Steel, &StainlessSteel), 45);
        assert_eq!(m.cost_between(&Steel, &Copper), 60);
        assert_eq!(m.cost_between(&Aluminum, &Copper), 35);
        assert_eq!(m.cost_between(&StainlessSteel, &Copper), 50);
    }

    #[test]
    fn unlisted_family_falls_back_to_default() {
        let m = ChangeoverMatrix::new().with_default_cost(25);
        assert_eq!(m.cost_between(&Steel, &Other("TITANIUM".into())), 25);
    }

    #[test]
    fn repeated_queries_are_deterministic() {
        let m = ChangeoverMatrix::new();
        let first = m.cost_between(&Steel, &Aluminum);
        for _ in 0..10 {
            assert_eq!(m.cost_between(&Steel, &Aluminum), first);
        }
    }
}
