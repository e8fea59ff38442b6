//! Closed intervals over [`Time`].
//!
//! The register engine summarises every variable by the window between the
//! first response and the last invocation among the calls touching it. If
//! the first response comes first, the window is *forward*: the variable
//! demonstrably held its value over that span. Otherwise the calls all
//! overlap and the window is *reversed*: it runs from the last invocation to
//! the first response, and any point inside it may host the variable's
//! whole lifetime.

use core::fmt::{Display, Formatter, Result as FmtResult};

use crate::history::types::Time;

/// Construction of an interval whose `start` lies after its `end`.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidInterval {
    pub start: Time,
    pub end: Time,
}

impl Display for InvalidInterval {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "interval start {} lies after end {}", self.start, self.end)
    }
}

/// A closed interval `[start, end]`, optionally marked as reversed.
///
/// A forward interval spans first response to last invocation; a reversed
/// one spans last invocation to first response. [`last_call`] and
/// [`first_response`] read the two points back regardless of orientation.
///
/// [`last_call`]: Interval::last_call
/// [`first_response`]: Interval::first_response
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: Time,
    pub end: Time,
    pub reversed: bool,
}

impl Interval {
    /// Strict constructor.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInterval`] if `start > end`.
    pub fn new(
        start: impl Into<Time>,
        end: impl Into<Time>,
        reversed: bool,
    ) -> Result<Self, InvalidInterval> {
        let (start, end) = (start.into(), end.into());
        if start > end {
            return Err(InvalidInterval { start, end });
        }
        Ok(Self {
            start,
            end,
            reversed,
        })
    }

    /// Silent constructor: swaps the bounds if they are out of order.
    #[must_use]
    pub fn ordered(a: impl Into<Time>, b: impl Into<Time>, reversed: bool) -> Self {
        let (a, b) = (a.into(), b.into());
        Self {
            start: a.min(b),
            end: a.max(b),
            reversed,
        }
    }

    /// Summarise a set of calls by their earliest response `low` and latest
    /// invocation `high`: forward `[low, high]` if `low < high`, else
    /// reversed `[high, low]`.
    #[must_use]
    pub fn from_bounds(low: Time, high: Time) -> Self {
        if low < high {
            Self {
                start: low,
                end: high,
                reversed: false,
            }
        } else {
            Self {
                start: high,
                end: low,
                reversed: true,
            }
        }
    }

    #[must_use]
    pub fn is_intersecting(&self, other: &Self) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    #[must_use]
    pub fn is_contained_in(&self, other: &Self) -> bool {
        self.start >= other.start && self.end <= other.end
    }

    /// Containment that excludes both endpoints of `other`.
    #[must_use]
    pub fn is_strictly_inside(&self, other: &Self) -> bool {
        self.start > other.start && self.end < other.end
    }

    /// The overlap of two intervals, or `None` if they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        self.is_intersecting(other).then(|| Self {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
            reversed: false,
        })
    }

    #[must_use]
    pub fn contains(&self, point: Time) -> bool {
        self.start <= point && point <= self.end
    }

    /// Latest invocation among the summarised calls.
    #[must_use]
    pub const fn last_call(&self) -> Time {
        if self.reversed {
            self.start
        } else {
            self.end
        }
    }

    /// Earliest response among the summarised calls.
    #[must_use]
    pub const fn first_response(&self) -> Time {
        if self.reversed {
            self.end
        } else {
            self.start
        }
    }

    /// `true` if everything summarised by `self` may be linearized before
    /// everything summarised by `other`: no call of `other` responds before
    /// a call of `self` is invoked.
    #[must_use]
    pub fn may_precede(&self, other: &Self) -> bool {
        self.last_call() <= other.first_response()
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if self.reversed {
            write!(f, "~[{} - {}]", self.start, self.end)
        } else {
            write!(f, "[{} - {}]", self.start, self.end)
        }
    }
}
