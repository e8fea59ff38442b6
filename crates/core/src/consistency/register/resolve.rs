//! Resolution of failed compare-and-swaps.
//!
//! A failed `cas(c, s)` only proves that the register held some value other
//! than `c` at one point inside its window. Each such call gets a candidate
//! set: the variables that may be live during its window. Every rule below
//! only discards variables that cannot be live, so an empty set is a sound
//! rejection.
//!
//! Calls that fall in the same write-free gap of the time axis observe the
//! same value, so their candidate sets must intersect.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::fmt::Debug;

use super::blocks::must_precede;
use super::classify::Bins;
use crate::consistency::error::{Error, Violation};
use crate::history::interval::Interval;
use crate::history::types::{Call, Operation, Time};

/// Failed compare-and-swaps that must observe the same variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Indices into the history.
    pub calls: Vec<usize>,
    /// Positions in the variable order every member may observe.
    pub candidates: BTreeSet<usize>,
}

/// Live-variable analysis over the variable order.
struct Resolver<'h, Value> {
    calls: &'h [Call<Value>],
    order: &'h [Value],
    intervals: Vec<Interval>,
    /// Invocation of each variable's writer.
    written: Vec<Option<Time>>,
    /// Response of the successful compare-and-swap replacing each variable.
    replaced: Vec<Option<Time>>,
    /// Earliest response among the variables each variable must precede.
    cutoff: Vec<Option<Time>>,
}

impl<'h, Value> Resolver<'h, Value>
where
    Value: Clone + Ord + Debug,
{
    fn new(
        calls: &'h [Call<Value>],
        bins: &Bins<Value>,
        intervals: &BTreeMap<Value, Interval>,
        order: &'h [Value],
    ) -> Self {
        let intervals: Vec<Interval> = order
            .iter()
            .map(|value| intervals.get(value).copied().unwrap_or(Interval::ordered(0.0, 0.0, true)))
            .collect();
        let written = order
            .iter()
            .map(|value| bins.get(value).and_then(|bin| bin.writer()).map(|index| calls[index].start))
            .collect();
        let replaced = order
            .iter()
            .map(|value| {
                bins.get(value)
                    .and_then(|bin| bin.outgoing.first())
                    .map(|index| calls[*index].end)
            })
            .collect();
        let cutoff = (0..order.len())
            .map(|x| {
                (0..order.len())
                    .filter(|u| *u != x && must_precede(&intervals[x], &intervals[*u]))
                    .map(|u| intervals[u].first_response())
                    .min()
            })
            .collect();
        Self {
            calls,
            order,
            intervals,
            written,
            replaced,
            cutoff,
        }
    }

    /// Variables that may be live while `call` takes effect.
    ///
    /// `settled` holds earlier failed compare-and-swaps resolved to a single
    /// variable, as `(response, position)`.
    fn candidates(&self, call: &Call<Value>, settled: &[(Time, usize)]) -> BTreeSet<usize> {
        let compare = match &call.op {
            Operation::Cas { compare, .. } => Some(compare),
            _ => None,
        };
        let span = call.span();

        let mut candidates: BTreeSet<usize> = (0..self.order.len())
            .filter(|x| self.written[*x].is_some_and(|start| start <= call.end))
            .filter(|x| Some(&self.order[*x]) != compare)
            .filter(|x| !self.replaced[*x].is_some_and(|end| end < call.start))
            .filter(|x| !self.cutoff[*x].is_some_and(|response| response < call.start))
            .collect();

        for (x, interval) in self.intervals.iter().enumerate() {
            if !interval.reversed && span.is_strictly_inside(interval) {
                candidates.retain(|candidate| *candidate == x);
            }
        }

        for &(response, observed) in settled {
            if response < call.start {
                candidates.retain(|y| {
                    *y == observed || !must_precede(&self.intervals[*y], &self.intervals[observed])
                });
            }
        }
        candidates
    }
}

/// Write-free gap containing `span`, or `None` if a write may take effect
/// inside it. `writes` are disjoint and sorted.
fn gap_of(writes: &[Interval], span: &Interval) -> Option<usize> {
    if writes.iter().any(|write| write.is_intersecting(span)) {
        return None;
    }
    Some(writes.iter().take_while(|write| write.end < span.start).count())
}

/// Union of the writers' windows as sorted disjoint intervals.
fn write_spans<Value>(calls: &[Call<Value>], bins: &Bins<Value>) -> Vec<Interval> {
    let mut spans: Vec<Interval> = bins
        .values()
        .filter_map(|bin| bin.writer())
        .map(|index| calls[index].span())
        .collect();
    spans.sort_by_key(|span| (span.start, span.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if last.is_intersecting(&span) => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

/// Compute candidate sets and feasible groups for every failed
/// compare-and-swap. `order` is the variable order from the block builder.
///
/// # Errors
///
/// Returns [`Violation::EmptyCandidates`] if no variable can explain a
/// call, and [`Violation::DisjointCandidates`] if the calls of one gap
/// share no candidate.
pub fn resolve_false_cases<Value>(
    calls: &[Call<Value>],
    bins: &Bins<Value>,
    intervals: &BTreeMap<Value, Interval>,
    order: &[Value],
    false_cas: &[usize],
) -> Result<Vec<Group>, Error<Value>>
where
    Value: Clone + Ord + Debug,
{
    let resolver = Resolver::new(calls, bins, intervals, order);

    let mut pending = false_cas.to_vec();
    pending.sort_by_key(|index| (calls[*index].end, *index));

    let mut settled: Vec<(Time, usize)> = Vec::new();
    let mut candidates: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    for &index in &pending {
        let call = &calls[index];
        let set = resolver.candidates(call, &settled);
        tracing::debug!(%call.start, %call.end, candidates = ?set, "failed compare-and-swap");
        if set.is_empty() {
            return Err(Violation::EmptyCandidates { call: call.clone() }.into());
        }
        if let (1, Some(only)) = (set.len(), set.first()) {
            settled.push((call.end, *only));
        }
        candidates.insert(index, set);
    }

    let writes = write_spans(calls, bins);
    let mut gaps: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut groups = Vec::new();
    for &index in &pending {
        match gap_of(&writes, &calls[index].span()) {
            Some(gap) => gaps.entry(gap).or_default().push(index),
            None => groups.push(alloc::vec![index]),
        }
    }
    groups.extend(gaps.into_values());

    groups
        .into_iter()
        .map(|members| {
            let mut common: Option<BTreeSet<usize>> = None;
            for index in &members {
                let set = &candidates[index];
                common = Some(match common {
                    None => set.clone(),
                    Some(common) => common.intersection(set).copied().collect(),
                });
            }
            let common = common.unwrap_or_default();
            if common.is_empty() {
                return Err(Error::Infeasible(Violation::DisjointCandidates {
                    calls: members.iter().map(|index| calls[*index].clone()).collect(),
                }));
            }
            Ok(Group {
                calls: members,
                candidates: common,
            })
        })
        .collect()
}
