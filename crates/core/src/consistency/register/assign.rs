//! Final order assignment.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt::Debug;

use super::classify::Bins;
use super::resolve::Group;
use crate::history::interval::Interval;
use crate::history::types::{Call, History, Time};

/// Real-time bounds of placing a call inside each variable's lifetime.
struct Placement {
    /// Latest invocation among the variables before each position.
    before: Vec<Option<Time>>,
    /// Earliest response among the variables after each position.
    after: Vec<Option<Time>>,
}

impl Placement {
    fn new(intervals: &[Interval]) -> Self {
        let mut before = Vec::with_capacity(intervals.len());
        let mut latest: Option<Time> = None;
        for interval in intervals {
            before.push(latest);
            latest = latest.max(Some(interval.last_call()));
        }

        let mut after = alloc::vec![None; intervals.len()];
        let mut earliest: Option<Time> = None;
        for (position, interval) in intervals.iter().enumerate().rev() {
            after[position] = earliest;
            let response = interval.first_response();
            earliest = Some(earliest.map_or(response, |time| time.min(response)));
        }
        Self { before, after }
    }

    fn fits<Value>(&self, position: usize, call: &Call<Value>) -> bool {
        self.before[position].is_none_or(|start| call.end >= start)
            && self.after[position].is_none_or(|end| call.start <= end)
    }
}

/// Pick the variable each group of failed compare-and-swaps observes.
///
/// The first common candidate in variable order whose lifetime fits every
/// call of the group is chosen. A group no candidate fits stays unplaced:
/// its calls get no number and the replay of the order rejects it.
#[must_use]
pub fn place_groups<Value>(
    calls: &[Call<Value>],
    intervals: &[Interval],
    groups: &[Group],
) -> BTreeMap<usize, Vec<usize>> {
    let placement = Placement::new(intervals);
    let mut placed: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for group in groups {
        let chosen = group.candidates.iter().copied().find(|position| {
            group
                .calls
                .iter()
                .all(|index| placement.fits(*position, &calls[*index]))
        });
        match chosen {
            Some(position) => placed.entry(position).or_default().extend(&group.calls),
            None => tracing::debug!(
                calls = ?group.calls,
                candidates = ?group.candidates,
                "no candidate fits the group, leaving it unplaced"
            ),
        }
    }
    placed
}

/// Number every call by walking the variables in order.
///
/// Inside a variable the writer comes first, then the reads and placed
/// failed compare-and-swaps by invocation, then the successful
/// compare-and-swap replacing the value. That last call is also the writer
/// of the next variable of its chain and keeps the number it already got.
#[must_use]
pub fn assign_orders<Value>(
    history: &History<Value>,
    bins: &Bins<Value>,
    order: &[Value],
    placed: &BTreeMap<usize, Vec<usize>>,
) -> History<Value>
where
    Value: Clone + Ord + Debug,
{
    let calls = &history.calls;
    let mut numbers: Vec<Option<u64>> = alloc::vec![None; calls.len()];
    let mut counter = 0;

    for (position, value) in order.iter().enumerate() {
        let Some(bin) = bins.get(value) else {
            continue;
        };
        let mut observers: Vec<usize> = bin.readers.clone();
        if let Some(failed) = placed.get(&position) {
            observers.extend(failed);
        }
        observers.sort_by_key(|index| (calls[*index].start, *index));

        for &index in bin.writers.iter().chain(&observers).chain(&bin.outgoing) {
            if numbers[index].is_none() {
                counter += 1;
                numbers[index] = Some(counter);
                tracing::trace!(?value, call = index, order = counter, "assigned order");
            }
        }
    }

    calls
        .iter()
        .zip(numbers)
        .map(|(call, order)| Call {
            order,
            ..call.clone()
        })
        .collect()
}
