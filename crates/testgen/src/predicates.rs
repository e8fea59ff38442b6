//! Shape predicates over register histories.
//!
//! Both return `false` for histories the register binning rejects (queue
//! calls).

use lincheck_core::consistency::register::classify::{intervals, populate_bins};
use lincheck_core::history::types::{Operation, Time};
use lincheck_core::History;

/// `true` if no two variables have intersecting intervals.
///
/// Such a history leaves the register engine nothing to arrange: every
/// variable occupies its own stretch of the time axis.
#[must_use]
pub fn intervals_strictly_ordered(history: &History<u64>) -> bool {
    let Ok(binned) = populate_bins(&history.calls) else {
        return false;
    };
    let intervals: Vec<_> = intervals(&history.calls, &binned.bins)
        .into_values()
        .collect();
    intervals.iter().enumerate().all(|(i, a)| {
        intervals[i + 1..]
            .iter()
            .all(|b| !a.is_intersecting(b))
    })
}

/// `true` if every failed compare-and-swap starts no earlier than the
/// first read of its compare value responds.
///
/// A failed compare-and-swap against a value nobody reads fails the check.
#[must_use]
pub fn reads_follow_false_cas(history: &History<u64>) -> bool {
    let Ok(binned) = populate_bins(&history.calls) else {
        return false;
    };
    binned.false_cas.iter().all(|&index| {
        let call = &history.calls[index];
        let Operation::Cas { compare, .. } = &call.op else {
            return false;
        };
        binned
            .bins
            .get(compare)
            .and_then(|bin| bin.readers.iter().map(|&r| history.calls[r].end).min())
            .is_some_and(|earliest: Time| call.start >= earliest)
    })
}

#[cfg(test)]
mod tests {
    use lincheck_core::Call;

    use super::*;

    #[test]
    fn test_disjoint_variables_are_strictly_ordered() {
        let history = History::new(vec![
            Call::write(1, 1, 0.0, 1.0),
            Call::read(1, 1, 2.0, 3.0),
            Call::write(1, 2, 4.0, 5.0),
            Call::read(2, 2, 6.0, 7.0),
        ]);
        assert!(intervals_strictly_ordered(&history));
    }

    #[test]
    fn test_overlapping_variables_are_not_strictly_ordered() {
        let history = History::new(vec![
            Call::write(1, 1, 0.0, 3.0),
            Call::write(2, 2, 1.0, 2.0),
        ]);
        assert!(!intervals_strictly_ordered(&history));
    }

    #[test]
    fn test_queue_history_satisfies_neither() {
        let history = History::new(vec![Call::enqueue(1, 1, 0.0, 1.0)]);
        assert!(!intervals_strictly_ordered(&history));
        assert!(!reads_follow_false_cas(&history));
    }

    #[test]
    fn test_reads_follow_false_cas() {
        let after = History::new(vec![
            Call::write(1, 1, 0.0, 1.0),
            Call::read(2, 1, 1.5, 2.0),
            Call::failed_cas(1, 1, 5, 2.0, 3.0),
        ]);
        assert!(reads_follow_false_cas(&after));

        let before = History::new(vec![
            Call::write(1, 1, 0.0, 1.0),
            Call::read(2, 1, 1.5, 4.0),
            Call::failed_cas(1, 1, 5, 2.0, 3.0),
        ]);
        assert!(!reads_follow_false_cas(&before));

        let unread = History::new(vec![
            Call::write(1, 1, 0.0, 1.0),
            Call::failed_cas(1, 1, 5, 2.0, 3.0),
        ]);
        assert!(!reads_follow_false_cas(&unread));
    }
}
