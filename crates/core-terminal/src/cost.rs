//! Cost domain for cursor motion planning.
//!
//! Every candidate motion plan is priced in output characters, padding
//! included. A missing capability makes a plan impossible, which is a
//! distinct `Infeasible` value rather than a large integer: arithmetic over
//! costs can therefore never overflow back into the feasible region, and
//! comparisons order every feasible cost below it.

use std::ops::Add;

/// Padded output length of a capability sequence, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Cost {
    Chars(u32),
    Infeasible,
}

impl Cost {
    pub const ZERO: Cost = Cost::Chars(0);

    pub fn is_feasible(self) -> bool {
        matches!(self, Cost::Chars(_))
    }

    /// Cost of repeating the priced sequence `n` times.
    pub fn times(self, n: usize) -> Cost {
        match self {
            Cost::Chars(c) => Cost::Chars(c.saturating_mul(n as u32)),
            Cost::Infeasible => Cost::Infeasible,
        }
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        match (self, rhs) {
            (Cost::Chars(a), Cost::Chars(b)) => Cost::Chars(a.saturating_add(b)),
            _ => Cost::Infeasible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infeasible_is_absorbing() {
        assert_eq!(Cost::Chars(3) + Cost::Infeasible, Cost::Infeasible);
        assert_eq!(Cost::Infeasible.times(0), Cost::Infeasible);
    }

    #[test]
    fn infeasible_compares_above_any_feasible_cost() {
        assert!(Cost::Chars(u32::MAX) < Cost::Infeasible);
        assert!(Cost::Chars(2) < Cost::Chars(9));
    }

    #[test]
    fn saturating_never_wraps_into_feasible() {
        let near_max = Cost::Chars(u32::MAX - 1);
        assert_eq!(near_max + Cost::Chars(100), Cost::Chars(u32::MAX));
        assert_eq!(near_max.times(1000), Cost::Chars(u32::MAX));
    }
}
