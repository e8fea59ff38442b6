//! Successful compare-and-swap chains.
//!
//! A successful `cas(a, b)` ends the lifetime of `a` and starts that of
//! `b`, so the two variables are adjacent in every linearization. The
//! compare-to-swap relation must be a set of simple paths; each path is
//! merged into one [`Unit::Chain`] and placed as a whole.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashSet;

use super::classify::Bins;
use super::Unit;
use crate::consistency::error::{Error, StructuralError, Violation};
use crate::graph::digraph::DiGraph;
use crate::history::interval::Interval;
use crate::history::types::{Call, Operation};

/// Build the compare-to-swap relation and check it is a set of paths.
///
/// # Errors
///
/// Returns [`StructuralError::SharedCompare`] if two successful
/// compare-and-swaps expect the same value, and
/// [`StructuralError::CasCycle`] if the relation is cyclic.
pub fn validate_true_cases<Value>(
    calls: &[Call<Value>],
    bins: &Bins<Value>,
) -> Result<DiGraph<Value>, Error<Value>>
where
    Value: Clone + Eq + Hash + Ord + Debug,
{
    let mut graph = DiGraph::default();
    for (value, bin) in bins {
        match bin.outgoing.as_slice() {
            [] => {}
            [index] => {
                if let Operation::Cas { compare, swap, .. } = &calls[*index].op {
                    graph.add_edge(compare.clone(), swap.clone());
                }
            }
            _ => {
                return Err(StructuralError::SharedCompare {
                    value: value.clone(),
                }
                .into())
            }
        }
    }
    if let Some(value) = graph.find_cycle_vertex() {
        return Err(StructuralError::CasCycle { value }.into());
    }
    Ok(graph)
}

/// Compare-to-swap order of every chained variable.
///
/// Reversed depth-first post-order of the relation.
#[must_use]
pub fn chain_order<Value>(graph: &DiGraph<Value>) -> Vec<Value>
where
    Value: Clone + Eq + Hash + Ord + Debug,
{
    let mut order = graph.post_order();
    order.reverse();
    order
}

/// Group variables into units: one [`Unit::Chain`] per maximal path of the
/// compare-to-swap relation, one [`Unit::Simple`] for every other variable.
#[must_use]
pub fn build_units<Value>(bins: &Bins<Value>, graph: &DiGraph<Value>) -> Vec<Unit<Value>>
where
    Value: Clone + Eq + Hash + Ord + Debug,
{
    let targets: HashSet<&Value> = graph.adj_map.values().flatten().collect();

    let mut units: Vec<Unit<Value>> = bins
        .keys()
        .filter(|value| !graph.adj_map.contains_key(*value))
        .map(|value| Unit::Simple(value.clone()))
        .collect();

    for head in chain_order(graph) {
        if targets.contains(&head) {
            continue;
        }
        let mut members = alloc::vec![head];
        while let Some(next) = members
            .last()
            .and_then(|last| graph.adj_map.get(last))
            .and_then(|successors| successors.iter().next())
        {
            members.push(next.clone());
        }
        units.push(Unit::Chain(members));
    }
    units
}

/// Check that real time allows the members of a chain in chain order.
///
/// Every ordered pair is compared, not only neighbours.
///
/// # Errors
///
/// Returns [`Violation::ChainOrder`] for the first pair whose calls force
/// the later member before the earlier one.
pub fn check_chain<Value>(
    intervals: &BTreeMap<Value, Interval>,
    members: &[Value],
) -> Result<(), Error<Value>>
where
    Value: Clone + Ord,
{
    let spans: Vec<(&Value, &Interval)> = members
        .iter()
        .filter_map(|value| intervals.get(value).map(|interval| (value, interval)))
        .collect();
    for (position, (earlier, a)) in spans.iter().enumerate() {
        if let Some((later, _)) = spans[position + 1..]
            .iter()
            .find(|(_, b)| !a.may_precede(b))
        {
            return Err(Violation::ChainOrder {
                earlier: (*earlier).clone(),
                later: (*later).clone(),
            }
            .into());
        }
    }
    Ok(())
}
