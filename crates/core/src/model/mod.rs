//! Sequential reference models.
//!
//! A linearization is valid when replaying its calls one by one against a
//! sequential model succeeds at every step. Models implement
//! [`SequentialObject`]: `Clone` provides an independent copy for every
//! branch of a search, [`apply`](SequentialObject::apply) performs one call.
//! New object types plug into the generic engine by implementing the trait.

use core::fmt::Debug;

use crate::consistency::error::Error;
use crate::history::types::{Call, ObjectKind};

pub mod queue;
pub mod register;

pub use queue::QueueState;
pub use register::RegisterState;

/// Outcome of applying one call to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<Value> {
    /// The call was legal in the current state; carries its return value.
    Applied(Option<Value>),
    /// The call cannot take effect in the current state.
    Inapplicable,
}

impl<Value> Step<Value> {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// A sequential specification of a shared object.
pub trait SequentialObject<Value>: Clone + Debug {
    /// The kind of calls this model accepts.
    const KIND: ObjectKind;

    /// Apply `call` to the model.
    ///
    /// On [`Step::Inapplicable`] the model is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelMismatch`] if `call` belongs to a different
    /// object kind. This is a contract violation of the caller, not a
    /// property of the history.
    fn apply(&mut self, call: &Call<Value>) -> Result<Step<Value>, Error<Value>>;

    /// Build the mismatch error for a call this model does not understand.
    fn mismatch(call: &Call<Value>) -> Error<Value>
    where
        Value: Clone,
    {
        Error::ModelMismatch {
            expected: Self::KIND,
            call: call.clone(),
        }
    }
}
