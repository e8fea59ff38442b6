//! Block construction and ordering.
//!
//! Units with a forward interval are anchored by real time and each opens a
//! block of its own. A reversed unit whose window contains a forward unit
//! joins that unit's block. The remaining reversed units are clustered by
//! overlap: two of them are linked when their windows intersect outside
//! every forward interval. Blocks, and the units inside each block, are then
//! ordered by the "must precede" relation, preferring the earliest response
//! whenever several are ready.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt::Debug;

use super::Unit;
use crate::consistency::error::{Error, StructuralError};
use crate::graph::digraph::DiGraph;
use crate::graph::ugraph::UGraph;
use crate::history::interval::Interval;
use crate::history::types::Time;

/// A unit together with the interval of all calls touching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member<Value> {
    pub unit: Unit<Value>,
    pub interval: Interval,
}

/// `true` if every linearization places `before` ahead of `after`: some
/// call of `after` starts once a call of `before` has already responded.
#[must_use]
pub fn must_precede(before: &Interval, after: &Interval) -> bool {
    !after.may_precede(before)
}

/// Group members into blocks, as indices into `members`.
#[must_use]
pub fn build_blocks<Value>(members: &[Member<Value>]) -> Vec<BTreeSet<usize>> {
    let (forward, reversed): (Vec<usize>, Vec<usize>) =
        (0..members.len()).partition(|index| !members[*index].interval.reversed);

    let mut blocks: Vec<BTreeSet<usize>> = forward.iter().map(|index| BTreeSet::from([*index])).collect();

    let mut overlap: UGraph<usize> = UGraph::default();
    for &index in &reversed {
        let window = &members[index].interval;
        let host = forward
            .iter()
            .enumerate()
            .filter(|(_, anchor)| members[**anchor].interval.is_contained_in(window))
            .min_by_key(|(_, anchor)| (members[**anchor].interval.start, **anchor));
        match host {
            Some((block, _)) => {
                blocks[block].insert(index);
            }
            None => overlap.add_vertex(index),
        }
    }

    let loose: Vec<usize> = reversed
        .iter()
        .copied()
        .filter(|index| overlap.adj_map.contains_key(index))
        .collect();
    for (position, &a) in loose.iter().enumerate() {
        for &b in &loose[position + 1..] {
            let shared = members[a].interval.intersection(&members[b].interval);
            let settled = shared.is_some_and(|shared| {
                forward
                    .iter()
                    .any(|anchor| shared.is_contained_in(&members[*anchor].interval))
            });
            if shared.is_some() && !settled {
                overlap.add_edge(a, b);
            }
        }
    }
    blocks.extend(overlap.connected_components());
    blocks
}

/// Earliest response among the members of a block.
fn earliest_response<Value>(members: &[Member<Value>], block: &BTreeSet<usize>) -> Time {
    block
        .iter()
        .map(|index| members[*index].interval.first_response())
        .min()
        .unwrap_or_default()
}

/// Order the members: blocks in "must precede" order, then the members of
/// each block the same way.
///
/// # Errors
///
/// Returns [`StructuralError::UnorderedBlocks`] if the relation between
/// blocks is cyclic.
pub fn order_members<Value>(members: &[Member<Value>]) -> Result<Vec<usize>, Error<Value>>
where
    Value: Debug,
{
    let blocks = build_blocks(members);
    tracing::debug!(members = members.len(), blocks = blocks.len(), "built blocks");

    let mut block_of = alloc::vec![0; members.len()];
    for (block, indices) in blocks.iter().enumerate() {
        for index in indices {
            block_of[*index] = block;
        }
    }

    let mut block_graph: DiGraph<usize> = DiGraph::default();
    for block in 0..blocks.len() {
        block_graph.add_vertex(block);
    }
    for (a, first) in members.iter().enumerate() {
        for (b, second) in members.iter().enumerate() {
            if block_of[a] != block_of[b] && must_precede(&first.interval, &second.interval) {
                block_graph.add_edge(block_of[a], block_of[b]);
            }
        }
    }

    let block_order = block_graph
        .topological_sort_by_key(|block| earliest_response(members, &blocks[*block]))
        .ok_or(StructuralError::UnorderedBlocks)?;

    let mut order = Vec::with_capacity(members.len());
    for block in block_order {
        let mut inner: DiGraph<usize> = DiGraph::default();
        for &a in &blocks[block] {
            inner.add_vertex(a);
            for &b in &blocks[block] {
                if a != b && must_precede(&members[a].interval, &members[b].interval) {
                    inner.add_edge(a, b);
                }
            }
        }
        let inner_order = inner
            .topological_sort_by_key(|index| members[*index].interval.first_response())
            .ok_or(StructuralError::UnorderedBlocks)?;
        tracing::debug!(block, units = ?inner_order, "ordered block");
        order.extend(inner_order);
    }
    Ok(order)
}
