//! Exhaustive linearization search for any sequential model.
//!
//! The search keeps one queue of pending calls per thread, sorted by
//! invocation. At every step only the heads of the queues are eligible, and
//! of those only the calls that no other pending call provably precedes:
//! a head is dropped when it starts after the earliest pending response.
//! Each remaining head is applied to a copy of the model state; applicable
//! heads advance their thread and recurse, inapplicable ones prune the
//! branch. Every complete branch is one linearization, and all of them are
//! returned.
//!
//! The worst case is exponential in the number of overlapping calls. This
//! engine is the reference the register engine is tested against.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::consistency::error::{Error, Violation};
use crate::history::types::{Call, History, Time};
use crate::model::{SequentialObject, Step};

/// Per-thread cursors over the history, advanced and restored while searching.
struct Search<'h, Value> {
    calls: &'h [Call<Value>],
    /// Call indices of each thread, sorted by invocation.
    queues: Vec<Vec<usize>>,
    cursors: Vec<usize>,
}

impl<'h, Value> Search<'h, Value>
where
    Value: Clone + Eq + Debug,
{
    fn new(history: &'h History<Value>) -> Self {
        let mut queues: Vec<Vec<usize>> = Vec::new();
        let mut threads = Vec::new();
        for (index, call) in history.iter().enumerate() {
            match threads.iter().position(|thread| *thread == call.thread) {
                Some(slot) => queues[slot].push(index),
                None => {
                    threads.push(call.thread);
                    queues.push(alloc::vec![index]);
                }
            }
        }
        for queue in &mut queues {
            queue.sort_by_key(|index| history.calls[*index].start);
        }
        let cursors = alloc::vec![0; queues.len()];
        Self {
            calls: &history.calls,
            queues,
            cursors,
        }
    }

    /// Heads of the non-empty queues, as `(thread slot, call index)`.
    fn frontier(&self) -> Vec<(usize, usize)> {
        self.queues
            .iter()
            .zip(&self.cursors)
            .enumerate()
            .filter_map(|(slot, (queue, cursor))| queue.get(*cursor).map(|index| (slot, *index)))
            .collect()
    }

    /// Frontier calls that may take effect next.
    ///
    /// The head with the earliest response is the reference; a head
    /// invoked after that response must wait for it. The reference itself
    /// always stays eligible.
    fn candidates(&self) -> Vec<(usize, usize)> {
        let frontier = self.frontier();
        let reference: Option<Time> = frontier.iter().map(|(_, index)| self.calls[*index].end).min();
        match reference {
            Some(bound) => frontier
                .into_iter()
                .filter(|(_, index)| self.calls[*index].start <= bound)
                .collect(),
            None => frontier,
        }
    }

    fn forward_book_keeping(&mut self, slot: usize) {
        self.cursors[slot] += 1;
    }

    fn backtrack_book_keeping(&mut self, slot: usize) {
        self.cursors[slot] -= 1;
    }

    /// All orders of the pending calls that `state` accepts, as call indices.
    fn continuations<State>(&mut self, state: &State) -> Result<Vec<Vec<usize>>, Error<Value>>
    where
        State: SequentialObject<Value>,
    {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Ok(alloc::vec![Vec::new()]);
        }

        let mut orders = Vec::new();
        for (slot, index) in candidates {
            let mut next = state.clone();
            if next.apply(&self.calls[index])? == Step::Inapplicable {
                continue;
            }
            self.forward_book_keeping(slot);
            let tails = self.continuations(&next);
            self.backtrack_book_keeping(slot);
            for tail in tails? {
                let mut order = Vec::with_capacity(tail.len() + 1);
                order.push(index);
                order.extend(tail);
                orders.push(order);
            }
        }
        Ok(orders)
    }
}

/// Enumerate every linearization of `history` against `initial`.
///
/// Each returned history lists the calls in linearization order with
/// `order` numbered from 1. An empty history has exactly one, empty,
/// linearization.
///
/// # Errors
///
/// Returns [`Violation::NoLinearization`] if no order exists, and
/// propagates [`Error::ModelMismatch`] if `initial` does not model the
/// history's object.
pub fn linearize_generic<Value, State>(
    history: &History<Value>,
    initial: &State,
) -> Result<Vec<History<Value>>, Error<Value>>
where
    Value: Clone + Eq + Debug,
    State: SequentialObject<Value>,
{
    let mut search = Search::new(history);
    tracing::debug!(
        calls = history.len(),
        threads = search.queues.len(),
        "exhaustive linearization search"
    );

    let orders = search.continuations(initial)?;
    tracing::debug!(linearizations = orders.len(), "exhaustive search finished");
    if orders.is_empty() {
        return Err(Violation::NoLinearization.into());
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            order
                .into_iter()
                .zip(1..)
                .map(|(index, position)| Call {
                    order: Some(position),
                    ..history.calls[index].clone()
                })
                .collect::<History<Value>>()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::verify::verify_order;
    use crate::model::{QueueState, RegisterState};

    #[test]
    fn test_empty_history_has_one_linearization() {
        let history: History<u64> = History::default();
        let orders = linearize_generic(&history, &RegisterState::default()).unwrap();
        assert_eq!(orders, vec![History::default()]);
    }

    #[test]
    fn test_sequential_history() {
        let history = History::new(vec![
            Call::write(1, 1u64, 0.0, 1.0),
            Call::read(1, 1, 2.0, 3.0),
        ]);
        let orders = linearize_generic(&history, &RegisterState::default()).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].calls[0].order, Some(1));
        assert_eq!(orders[0].calls[1].order, Some(2));
    }

    #[test]
    fn test_overlapping_writes_both_orders() {
        let history = History::new(vec![
            Call::write(1, 1u64, 0.0, 2.0),
            Call::write(2, 2, 0.0, 2.0),
        ]);
        let orders = linearize_generic(&history, &RegisterState::default()).unwrap();
        assert_eq!(orders.len(), 2);
        for order in &orders {
            assert_eq!(verify_order(order, RegisterState::default()), Ok(()));
        }
    }

    #[test]
    fn test_touching_calls_may_swap() {
        // the read responds exactly when the write is invoked
        let history = History::new(vec![
            Call::read(1, 1u64, 0.0, 1.0),
            Call::write(2, 1, 1.0, 2.0),
        ]);
        let orders = linearize_generic(&history, &RegisterState::default()).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].calls[0].op, crate::history::types::Operation::Write(1));
    }

    #[test]
    fn test_infeasible_queue() {
        let history = History::new(vec![
            Call::enqueue(1, 1u64, 0.0, 1.0),
            Call::enqueue(1, 2, 2.0, 3.0),
            Call::dequeue(2, 2, 4.0, 5.0),
        ]);
        assert_eq!(
            linearize_generic(&history, &QueueState::default()),
            Err(Error::Infeasible(Violation::NoLinearization))
        );
    }

    #[test]
    fn test_model_mismatch_propagates() {
        let history = History::new(vec![Call::write(1, 1u64, 0.0, 1.0)]);
        assert!(matches!(
            linearize_generic(&history, &QueueState::default()),
            Err(Error::ModelMismatch { .. })
        ));
    }
}
