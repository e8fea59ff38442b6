//! Register engine for write, read and compare-and-swap histories.
//!
//! Every value is assumed to be stored exactly once, which turns each value
//! into a variable with a contiguous lifetime in any linearization. The
//! engine orders those lifetimes instead of searching over calls:
//!
//! 1. [`classify`] bins calls per variable, checks the structural
//!    preconditions and computes each variable's interval.
//! 2. [`chain`] validates successful compare-and-swaps and merges each
//!    compare-to-swap path into a single unit.
//! 3. [`blocks`] groups units into blocks and orders them.
//! 4. [`resolve`] computes which variable each failed compare-and-swap may
//!    observe.
//! 5. [`assign`] numbers the calls.
//!
//! The resulting order is replayed with
//! [`verify_order`](crate::consistency::verify::verify_order) before it is
//! returned, so a positive answer is always backed by a valid
//! linearization. Histories outside the engine's assumptions are reported
//! as [`Error::Unclassifiable`].

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use self::blocks::Member;
use self::classify::Binned;
use crate::consistency::error::{Error, StructuralError};
use crate::consistency::verify::verify_order;
use crate::history::types::History;
use crate::model::RegisterState;

pub mod assign;
pub mod blocks;
pub mod chain;
pub mod classify;
pub mod resolve;

/// A block member: a single variable or a merged compare-and-swap chain.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unit<Value> {
    Simple(Value),
    /// Variables in compare-to-swap order.
    Chain(Vec<Value>),
}

impl<Value> Unit<Value> {
    /// The variables of the unit in order.
    #[must_use]
    pub fn flatten(&self) -> &[Value] {
        match self {
            Self::Simple(value) => core::slice::from_ref(value),
            Self::Chain(values) => values,
        }
    }
}

/// Find one linearization of a register history.
///
/// Returns the input history with `order` assigned to every call, in input
/// order. A successful compare-and-swap that feeds the next variable of
/// its chain carries a single number.
///
/// # Errors
///
/// - [`Error::Unclassifiable`] if the history violates the engine's
///   structural assumptions, or if the assembled order fails replay.
/// - [`Error::Infeasible`] if the history is provably not linearizable.
/// - [`Error::ModelMismatch`] for a queue call.
pub fn linearize_register<Value>(history: &History<Value>) -> Result<History<Value>, Error<Value>>
where
    Value: Clone + Eq + Hash + Ord + Debug,
{
    let calls = history.calls.as_slice();

    let Binned { bins, false_cas } = classify::populate_bins(calls)?;
    tracing::debug!(
        variables = bins.len(),
        false_cas = false_cas.len(),
        "binned register calls"
    );
    classify::check_bins(calls, &bins)?;

    let intervals = classify::intervals(calls, &bins);
    tracing::debug!(
        forward = intervals.values().filter(|interval| !interval.reversed).count(),
        reversed = intervals.values().filter(|interval| interval.reversed).count(),
        "classified intervals"
    );
    classify::io_check(&intervals)?;

    let cas_graph = chain::validate_true_cases(calls, &bins)?;
    let units = chain::build_units(&bins, &cas_graph);
    let mut members = Vec::with_capacity(units.len());
    for unit in units {
        if let Unit::Chain(values) = &unit {
            chain::check_chain(&intervals, values)?;
            tracing::debug!(chain = ?values, "merged compare-and-swap chain");
        }
        let touching = unit
            .flatten()
            .iter()
            .filter_map(|value| bins.get(value))
            .flat_map(classify::Bin::calls);
        if let Some(interval) = classify::summarise(calls, touching) {
            members.push(Member { unit, interval });
        }
    }

    let order: Vec<Value> = blocks::order_members(&members)?
        .into_iter()
        .flat_map(|index| members[index].unit.flatten().to_vec())
        .collect();

    let groups = resolve::resolve_false_cases(calls, &bins, &intervals, &order, &false_cas)?;
    tracing::debug!(groups = groups.len(), "resolved failed compare-and-swaps");

    let spans: Vec<_> = order
        .iter()
        .filter_map(|value| intervals.get(value).copied())
        .collect();
    let placed = assign::place_groups(calls, &spans, &groups);
    let ordered = assign::assign_orders(history, &bins, &order, &placed);

    match verify_order(&ordered, RegisterState::default()) {
        Ok(()) => Ok(ordered),
        Err(Error::Infeasible(violation)) => {
            tracing::debug!(?violation, "assembled order failed replay");
            Err(StructuralError::UnverifiedOrder(violation).into())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::error::Violation;
    use crate::history::types::Call;

    fn orders(history: &History<u64>) -> Vec<Option<u64>> {
        history.iter().map(|call| call.order).collect()
    }

    #[test]
    fn test_empty_history() {
        let history: History<u64> = History::default();
        assert_eq!(linearize_register(&history), Ok(History::default()));
    }

    #[test]
    fn test_overlapping_write_and_read() {
        let history = History::new(vec![
            Call::write(1, 1u64, 0.0, 2.0),
            Call::read(2, 1, 0.0, 2.0),
        ]);
        let ordered = linearize_register(&history).unwrap();
        assert_eq!(orders(&ordered), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_variables_follow_real_time() {
        let history = History::new(vec![
            Call::read(2, 2, 6.0, 7.0),
            Call::write(1, 2, 4.0, 5.0),
            Call::read(2, 1, 1.0, 3.0),
            Call::write(1, 1, 0.0, 2.0),
        ]);
        let ordered = linearize_register(&history).unwrap();
        assert_eq!(orders(&ordered), vec![Some(4), Some(3), Some(2), Some(1)]);
    }

    #[test]
    fn test_chain_with_failed_cas() {
        let history = History::new(vec![
            Call::write(1, 1u64, 0.0, 1.0),
            Call::cas(2, 1, 2, 2.0, 3.0),
            Call::failed_cas(3, 1, 7, 4.0, 5.0),
            Call::read(1, 2, 6.0, 7.0),
        ]);
        let ordered = linearize_register(&history).unwrap();
        assert_eq!(orders(&ordered), vec![Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(verify_order(&ordered, RegisterState::default()), Ok(()));
    }

    #[test]
    fn test_stale_read_is_rejected() {
        let history = History::new(vec![
            Call::write(1, 0u64, 0.0, 1.0),
            Call::write(2, 1, 1.2, 5.0),
            Call::read(3, 1, 1.5, 2.5),
            Call::read(1, 0, 3.0, 4.0),
        ]);
        assert_eq!(
            linearize_register(&history),
            Err(Error::Infeasible(Violation::Straddle {
                first: 0,
                second: 1
            }))
        );
    }

    #[test]
    fn test_queue_history_is_a_mismatch() {
        let history = History::new(vec![Call::enqueue(1, 1u64, 0.0, 1.0)]);
        assert!(matches!(
            linearize_register(&history),
            Err(Error::ModelMismatch { .. })
        ));
    }

    #[test]
    fn test_unit_flatten() {
        assert_eq!(Unit::Simple(3u64).flatten(), &[3]);
        assert_eq!(Unit::Chain(vec![1u64, 2]).flatten(), &[1, 2]);
    }
}
