//! Per-variable binning and interval classification.
//!
//! Every value of a register history is treated as a variable: the single
//! call that stores it opens its lifetime, and every call that observes it
//! must fall inside. Binning attaches each call to the variables it touches,
//! the structural checks reject histories the engine cannot reason about,
//! and [`io_check`] rejects pairs of variables whose calls interleave in
//! real time.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::consistency::error::{Error, StructuralError, Violation};
use crate::history::interval::Interval;
use crate::history::types::{Call, ObjectKind, Operation};

/// Calls touching one variable, as indices into the history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bin {
    /// Writes of the value and successful compare-and-swaps storing it.
    pub writers: Vec<usize>,
    /// Reads returning the value.
    pub readers: Vec<usize>,
    /// Successful compare-and-swaps replacing the value.
    pub outgoing: Vec<usize>,
}

impl Bin {
    /// The call that stores the value. Unique once [`check_bins`] passed.
    #[must_use]
    pub fn writer(&self) -> Option<usize> {
        self.writers.first().copied()
    }

    /// Every call touching the variable.
    pub fn calls(&self) -> impl Iterator<Item = usize> + '_ {
        self.writers
            .iter()
            .chain(&self.readers)
            .chain(&self.outgoing)
            .copied()
    }
}

pub type Bins<Value> = BTreeMap<Value, Bin>;

#[derive(Debug, Clone, Default)]
pub struct Binned<Value> {
    pub bins: Bins<Value>,
    /// Failed compare-and-swaps; they belong to no variable until resolved.
    pub false_cas: Vec<usize>,
}

/// Attach every call to the variables it touches.
///
/// A successful compare-and-swap is bound twice: it replaces its compare
/// value and stores its swap value.
///
/// # Errors
///
/// Returns [`Error::ModelMismatch`] for a queue call.
pub fn populate_bins<Value>(calls: &[Call<Value>]) -> Result<Binned<Value>, Error<Value>>
where
    Value: Clone + Ord,
{
    let mut binned = Binned {
        bins: Bins::new(),
        false_cas: Vec::new(),
    };
    for (index, call) in calls.iter().enumerate() {
        match &call.op {
            Operation::Write(value) => binned.bins.entry(value.clone()).or_default().writers.push(index),
            Operation::Read(value) => binned.bins.entry(value.clone()).or_default().readers.push(index),
            Operation::Cas {
                compare,
                swap,
                cond: true,
            } => {
                binned.bins.entry(compare.clone()).or_default().outgoing.push(index);
                binned.bins.entry(swap.clone()).or_default().writers.push(index);
            }
            Operation::Cas { cond: false, .. } => binned.false_cas.push(index),
            Operation::Enqueue(_) | Operation::Dequeue(_) => {
                return Err(Error::ModelMismatch {
                    expected: ObjectKind::Register,
                    call: call.clone(),
                })
            }
        }
    }
    Ok(binned)
}

/// Structural preconditions of the register engine.
///
/// # Errors
///
/// Returns [`Error::Unclassifiable`] if a variable has no writer, more than
/// one writer, or an observer that responds before its writer is invoked.
pub fn check_bins<Value>(calls: &[Call<Value>], bins: &Bins<Value>) -> Result<(), Error<Value>>
where
    Value: Clone,
{
    for (value, bin) in bins {
        let writer = match bin.writers.as_slice() {
            [] => return Err(StructuralError::MissingWrite { value: value.clone() }.into()),
            [writer] => &calls[*writer],
            _ => return Err(StructuralError::MultipleWrites { value: value.clone() }.into()),
        };
        if let Some(early) = bin
            .readers
            .iter()
            .chain(&bin.outgoing)
            .map(|index| &calls[*index])
            .find(|call| call.end <= writer.start)
        {
            return Err(StructuralError::ReadBeforeWrite {
                call: early.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Summarise calls by their earliest response and latest invocation.
///
/// Returns `None` for an empty set of calls.
pub fn summarise<Value>(
    calls: &[Call<Value>],
    members: impl IntoIterator<Item = usize>,
) -> Option<Interval> {
    members
        .into_iter()
        .map(|index| &calls[index])
        .fold(None, |bounds, call| {
            Some(match bounds {
                None => (call.end, call.start),
                Some((low, high)) => (call.end.min(low), call.start.max(high)),
            })
        })
        .map(|(low, high)| Interval::from_bounds(low, high))
}

/// Interval of every variable.
pub fn intervals<Value>(calls: &[Call<Value>], bins: &Bins<Value>) -> BTreeMap<Value, Interval>
where
    Value: Clone + Ord,
{
    bins.iter()
        .filter_map(|(value, bin)| summarise(calls, bin.calls()).map(|interval| (value.clone(), interval)))
        .collect()
}

/// Reject the history if two variables can be ordered neither way.
///
/// The lifetimes of two variables never overlap in a linearization, so one
/// of them must fit entirely before the other.
///
/// # Errors
///
/// Returns [`Violation::Straddle`] naming the first such pair.
pub fn io_check<Value>(intervals: &BTreeMap<Value, Interval>) -> Result<(), Error<Value>>
where
    Value: Clone + Debug,
{
    let entries: Vec<(&Value, &Interval)> = intervals.iter().collect();
    for (position, (first, a)) in entries.iter().enumerate() {
        for (second, b) in &entries[position + 1..] {
            if !a.may_precede(b) && !b.may_precede(a) {
                tracing::debug!(?first, ?second, %a, %b, "variables straddle");
                return Err(Violation::Straddle {
                    first: (*first).clone(),
                    second: (*second).clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}
