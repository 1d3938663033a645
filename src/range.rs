//! Sequence ranges and the range-narrowing recovery step
//!
//! A download request carries a set of disjoint inclusive chapter ranges.
//! Membership is a pure predicate; narrowing produces a new set rather than
//! mutating in place, so a restarted resolve pass always sees a consistent
//! range state.

use serde::{Deserialize, Serialize};

/// One inclusive chapter range
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceRange {
    /// Lower bound (inclusive)
    pub first: f64,
    /// Upper bound (inclusive)
    pub last: f64,
}

impl SequenceRange {
    /// Create a new inclusive range
    pub fn new(first: f64, last: f64) -> Self {
        Self { first, last }
    }

    /// Whether `value` lies within `[first, last]`
    pub fn contains(&self, value: f64) -> bool {
        self.first <= value && value <= self.last
    }
}

/// An ordered set of disjoint chapter ranges
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSet(Vec<SequenceRange>);

impl RangeSet {
    /// Create a range set from an explicit list of ranges
    pub fn new(ranges: Vec<SequenceRange>) -> Self {
        Self(ranges)
    }

    /// Create a single-range set from first/last chapter bounds
    ///
    /// `last = None` means open-ended (no upper bound).
    pub fn from_bounds(first: f64, last: Option<f64>) -> Self {
        Self(vec![SequenceRange::new(
            first,
            last.unwrap_or(f64::INFINITY),
        )])
    }

    /// Whether the set contains no ranges at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The ranges in this set
    pub fn ranges(&self) -> &[SequenceRange] {
        &self.0
    }

    /// Range-membership predicate for a raw chapter label
    ///
    /// A label that does not parse as a number (the empty string included) is
    /// eligible iff `allow_unnumbered` is set. A numeric label is eligible iff
    /// it falls inside any range; both bounds are inclusive.
    pub fn contains_label(&self, label: &str, allow_unnumbered: bool) -> bool {
        match label.trim().parse::<f64>() {
            Ok(number) => self.0.iter().any(|r| r.contains(number)),
            Err(_) => allow_unnumbered,
        }
    }

    /// Narrow the set at a known-bad chapter number
    ///
    /// Ranges entirely below `at` are dropped, ranges bracketing `at` have
    /// their lower bound raised to `at`, ranges entirely above `at` are kept
    /// unchanged. Each narrowing strictly raises the effective lower bound or
    /// removes a range, so repeated recovery terminates.
    #[must_use]
    pub fn narrowed(&self, at: f64) -> Self {
        let ranges = self
            .0
            .iter()
            .filter_map(|r| {
                if r.last < at {
                    None
                } else if r.first <= at {
                    Some(SequenceRange::new(at, r.last))
                } else {
                    Some(*r)
                }
            })
            .collect();
        Self(ranges)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn set(ranges: &[(f64, f64)]) -> RangeSet {
        RangeSet::new(
            ranges
                .iter()
                .map(|&(first, last)| SequenceRange::new(first, last))
                .collect(),
        )
    }

    #[test]
    fn membership_includes_both_bounds() {
        let ranges = set(&[(1.0, 3.0)]);
        assert!(ranges.contains_label("1", false));
        assert!(ranges.contains_label("3", false));
        assert!(ranges.contains_label("2.5", false));
        assert!(!ranges.contains_label("0.9", false));
        assert!(!ranges.contains_label("3.1", false));
    }

    #[test]
    fn membership_checks_every_range() {
        let ranges = set(&[(1.0, 2.0), (10.0, 20.0)]);
        assert!(ranges.contains_label("1.5", false));
        assert!(ranges.contains_label("15", false));
        assert!(!ranges.contains_label("5", false));
    }

    #[test]
    fn unnumbered_labels_respect_the_allowance_flag() {
        let ranges = set(&[(1.0, 3.0)]);
        assert!(ranges.contains_label("", true));
        assert!(ranges.contains_label("Oneshot", true));
        assert!(!ranges.contains_label("", false));
        assert!(!ranges.contains_label("Oneshot", false));
    }

    #[test]
    fn from_bounds_open_ended_has_no_upper_limit() {
        let ranges = RangeSet::from_bounds(5.0, None);
        assert!(ranges.contains_label("5", false));
        assert!(ranges.contains_label("100000", false));
        assert!(!ranges.contains_label("4.9", false));
    }

    #[test]
    fn narrowing_raises_the_lower_bound_of_bracketing_ranges() {
        let ranges = set(&[(1.0, 10.0)]).narrowed(5.0);
        assert_eq!(ranges.ranges(), &[SequenceRange::new(5.0, 10.0)]);
    }

    #[test]
    fn narrowing_drops_ranges_entirely_below() {
        let ranges = set(&[(1.0, 3.0), (4.0, 10.0)]).narrowed(5.0);
        assert_eq!(ranges.ranges(), &[SequenceRange::new(5.0, 10.0)]);
    }

    #[test]
    fn narrowing_keeps_ranges_entirely_above_untouched() {
        let ranges = set(&[(1.0, 3.0), (7.0, 10.0)]).narrowed(5.0);
        assert_eq!(ranges.ranges(), &[SequenceRange::new(7.0, 10.0)]);
    }

    #[test]
    fn narrowing_is_monotone() {
        // No resulting lower bound below the narrowing point, no upper bound
        // ever decreases.
        let before = set(&[(1.0, 4.0), (2.0, 8.0), (6.0, 9.0), (12.0, 20.0)]);
        let after = before.narrowed(5.0);
        for r in after.ranges() {
            assert!(r.first >= 5.0);
            assert!(
                before
                    .ranges()
                    .iter()
                    .any(|b| b.last == r.last && b.first <= r.first)
            );
        }
        // The range ending at 4.0 is gone entirely.
        assert!(after.ranges().iter().all(|r| r.last != 4.0));
    }

    #[test]
    fn narrowing_at_a_bound_keeps_the_boundary_chapter() {
        // Narrowing at the failing chapter must force a redo *starting at* it.
        let ranges = set(&[(1.0, 10.0)]).narrowed(10.0);
        assert!(ranges.contains_label("10", false));
        assert!(!ranges.contains_label("9.5", false));
    }
}
