use alloc::collections::VecDeque;

use crate::consistency::error::Error;
use crate::history::types::{Call, ObjectKind, Operation};
use crate::model::{SequentialObject, Step};

/// FIFO queue model.
///
/// `enqueue` always applies; `dequeue(v)` applies only when `v` is at the
/// front of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueState<Value> {
    pub items: VecDeque<Value>,
}

impl<Value> Default for QueueState<Value> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<Value> SequentialObject<Value> for QueueState<Value>
where
    Value: Clone + Eq + core::fmt::Debug,
{
    const KIND: ObjectKind = ObjectKind::Queue;

    fn apply(&mut self, call: &Call<Value>) -> Result<Step<Value>, Error<Value>> {
        match &call.op {
            Operation::Enqueue(value) => {
                self.items.push_back(value.clone());
                Ok(Step::Applied(None))
            }
            Operation::Dequeue(value) => {
                if self.items.front() == Some(value) {
                    Ok(Step::Applied(self.items.pop_front()))
                } else {
                    Ok(Step::Inapplicable)
                }
            }
            _ => Err(Self::mismatch(call)),
        }
    }
}
