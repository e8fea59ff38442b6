use alloc::vec::Vec;

use crate::history::types::History;

/// Evidence that a history is linearizable.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Witness<Value> {
    /// The input history with an `order` assigned to every call.
    /// Returned by the register engine.
    RegisterOrder(History<Value>),
    /// Every valid linearization, each a call sequence numbered `1..=k`.
    /// Returned by the generic engine; never empty.
    Linearizations(Vec<History<Value>>),
}

impl<Value> Witness<Value> {
    /// One linearization proving the verdict.
    #[must_use]
    pub fn order(&self) -> Option<&History<Value>> {
        match self {
            Self::RegisterOrder(history) => Some(history),
            Self::Linearizations(orders) => orders.first(),
        }
    }

    /// Number of linearizations carried by the witness.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::RegisterOrder(_) => 1,
            Self::Linearizations(orders) => orders.len(),
        }
    }
}
