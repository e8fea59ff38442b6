//! Replay verification of a total order.
//!
//! [`verify_order`] accepts a history whose calls all carry an `order` and
//! confirms that the numbered sequence is a linearization: it applies to
//! the sequential model step by step and respects real time and program
//! order. Both engines' outputs pass it; the register engine runs it on its
//! own result before answering.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::consistency::error::{Error, Violation};
use crate::history::types::{Call, History, ThreadId};
use crate::model::{SequentialObject, Step};

/// Replay `history` in the order given by its calls' `order` numbers.
///
/// # Errors
///
/// Returns [`Error::Infeasible`] with the first [`Violation`] found:
/// an unordered call, two calls sharing a number, a call the model
/// rejects, or a pair ordered against real time or program order.
/// Propagates [`Error::ModelMismatch`] from the model.
pub fn verify_order<Value, State>(history: &History<Value>, initial: State) -> Result<(), Error<Value>>
where
    Value: Clone + Eq + Debug,
    State: SequentialObject<Value>,
{
    let mut calls: Vec<(u64, usize, &Call<Value>)> = Vec::with_capacity(history.len());
    for (index, call) in history.iter().enumerate() {
        let order = call
            .order
            .ok_or_else(|| Violation::Unordered { call: call.clone() })?;
        calls.push((order, index, call));
    }
    calls.sort_by_key(|(order, _, _)| *order);

    if let Some(pair) = calls.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(Violation::DuplicateOrder { order: pair[0].0 }.into());
    }

    let mut state = initial;
    for &(_, _, call) in &calls {
        if state.apply(call)? == Step::Inapplicable {
            return Err(Violation::Inapplicable {
                call: call.clone(),
            }
            .into());
        }
    }

    // the latest-starting call so far is the one most likely to be outrun
    let mut latest_start: Option<&Call<Value>> = None;
    let position = thread_positions(history);
    let mut last_in_thread: BTreeMap<ThreadId, (usize, &Call<Value>)> = BTreeMap::new();
    for &(_, index, call) in &calls {
        if let Some(earlier) = latest_start {
            if call.precedes(earlier) {
                return Err(Violation::RealTime {
                    before: call.clone(),
                    after: earlier.clone(),
                }
                .into());
            }
        }
        if latest_start.is_none_or(|earlier| call.start > earlier.start) {
            latest_start = Some(call);
        }

        if let Some((previous_position, previous)) =
            last_in_thread.insert(call.thread, (position[index], call))
        {
            if position[index] < previous_position {
                return Err(Violation::ProgramOrder {
                    before: call.clone(),
                    after: previous.clone(),
                }
                .into());
            }
        }
    }

    Ok(())
}

/// Position of every call inside its thread: by invocation, then by input
/// position. Calls invoked at the same instant keep their input order.
fn thread_positions<Value>(history: &History<Value>) -> Vec<usize> {
    let mut threads: BTreeMap<ThreadId, Vec<usize>> = BTreeMap::new();
    for (index, call) in history.iter().enumerate() {
        threads.entry(call.thread).or_default().push(index);
    }

    let mut position = alloc::vec![0; history.len()];
    for indices in threads.values_mut() {
        indices.sort_by_key(|index| (history.calls[*index].start, *index));
        for (rank, index) in indices.iter().enumerate() {
            position[*index] = rank;
        }
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QueueState, RegisterState};

    fn numbered(mut calls: Vec<Call<u64>>) -> History<u64> {
        for (position, call) in calls.iter_mut().enumerate() {
            call.order = Some(position as u64 + 1);
        }
        History::new(calls)
    }

    #[test]
    fn test_accepts_valid_order() {
        let history = numbered(vec![
            Call::write(1, 1, 0.0, 2.0),
            Call::read(2, 1, 0.0, 2.0),
            Call::cas(1, 1, 2, 3.0, 4.0),
            Call::failed_cas(2, 1, 3, 5.0, 6.0),
        ]);
        assert_eq!(verify_order(&history, RegisterState::default()), Ok(()));
    }

    #[test]
    fn test_rejects_missing_and_duplicate_orders() {
        let mut history = numbered(vec![Call::write(1, 1, 0.0, 1.0), Call::read(2, 1, 0.0, 1.0)]);
        history.calls[1].order = None;
        assert!(matches!(
            verify_order(&history, RegisterState::default()),
            Err(Error::Infeasible(Violation::Unordered { .. }))
        ));

        history.calls[1].order = Some(1);
        assert_eq!(
            verify_order(&history, RegisterState::default()),
            Err(Error::Infeasible(Violation::DuplicateOrder { order: 1 }))
        );
    }

    #[test]
    fn test_rejects_inapplicable_step() {
        let history = numbered(vec![Call::read(2, 1, 0.0, 2.0), Call::write(1, 1, 0.0, 2.0)]);
        assert!(matches!(
            verify_order(&history, RegisterState::default()),
            Err(Error::Infeasible(Violation::Inapplicable { .. }))
        ));
    }

    #[test]
    fn test_rejects_real_time_inversion() {
        // the second write finished before the first began
        let history = numbered(vec![
            Call::write(1, 1, 5.0, 6.0),
            Call::write(2, 2, 0.0, 1.0),
        ]);
        assert_eq!(
            verify_order(&history, RegisterState::default()),
            Err(Error::Infeasible(Violation::RealTime {
                before: history.calls[1].clone(),
                after: history.calls[0].clone(),
            }))
        );
    }

    #[test]
    fn test_same_instant_calls_keep_input_order() {
        // both calls of thread 1 start at 0; the zero-length write comes first
        let against_input = History::new(vec![
            Call {
                order: Some(2),
                ..Call::write(1, 1u64, 0.0, 0.0)
            },
            Call {
                order: Some(1),
                ..Call::write(1, 2, 0.0, 2.0)
            },
        ]);
        assert!(matches!(
            verify_order(&against_input, RegisterState::default()),
            Err(Error::Infeasible(Violation::ProgramOrder { .. }))
        ));

        let with_input = numbered(vec![Call::write(1, 1, 0.0, 0.0), Call::write(1, 2, 0.0, 2.0)]);
        assert_eq!(verify_order(&with_input, RegisterState::default()), Ok(()));
    }

    #[test]
    fn test_rejects_program_order_inversion() {
        // touching calls are not ordered by real time, only by their thread
        let history = numbered(vec![
            Call::enqueue(1, 2, 1.0, 2.0),
            Call::enqueue(1, 1, 0.0, 1.0),
        ]);
        assert!(matches!(
            verify_order(&history, QueueState::default()),
            Err(Error::Infeasible(Violation::ProgramOrder { .. }))
        ));
    }
}
