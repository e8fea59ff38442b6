use alloc::vec::Vec;
use core::fmt::{Display, Formatter, Result as FmtResult};

use derive_more::From;

use crate::history::types::{Call, ObjectKind};

/// A history shape the register engine does not handle.
///
/// These are not verdicts: the history may still be linearizable, and the
/// caller is expected to fall back to the generic engine.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralError<Value> {
    /// A value is read or compared against but never written.
    MissingWrite { value: Value },
    /// A value is stored by more than one write or successful compare-and-swap.
    MultipleWrites { value: Value },
    /// A call observing a value responded before that value's write started.
    ReadBeforeWrite { call: Call<Value> },
    /// Successful compare-and-swaps form a cycle through `value`.
    CasCycle { value: Value },
    /// Two successful compare-and-swaps expect the same `value`.
    SharedCompare { value: Value },
    /// No order of blocks is consistent with real time.
    UnorderedBlocks,
    /// The assembled order failed replay.
    UnverifiedOrder(Violation<Value>),
}

/// Evidence that no linearization exists, or that a claimed order is invalid.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation<Value> {
    /// Exhaustive search found no order.
    NoLinearization,
    /// The calls of `first` and `second` can be ordered neither way.
    Straddle { first: Value, second: Value },
    /// Real time places `later` before `earlier` in a compare-and-swap chain.
    ChainOrder { earlier: Value, later: Value },
    /// No written value can explain the failed compare-and-swap `call`.
    EmptyCandidates { call: Call<Value> },
    /// Failed compare-and-swaps that must observe one value have no common candidate.
    DisjointCandidates { calls: Vec<Call<Value>> },
    /// A call carries no order number.
    Unordered { call: Call<Value> },
    /// Two distinct calls share the order number `order`.
    DuplicateOrder { order: u64 },
    /// Replay reached a call the sequential model rejects.
    Inapplicable { call: Call<Value> },
    /// `before` responded before `after` was invoked but is ordered later.
    RealTime {
        before: Call<Value>,
        after: Call<Value>,
    },
    /// Two calls of one thread are ordered against their program order.
    ProgramOrder {
        before: Call<Value>,
        after: Call<Value>,
    },
}

/// Error returned when a history cannot be linearized.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum Error<Value> {
    /// The register engine declines to decide; fall back to the generic engine.
    Unclassifiable(StructuralError<Value>),
    /// The history is not linearizable.
    Infeasible(Violation<Value>),
    /// A call was applied to a model of a different object kind.
    #[from(ignore)]
    ModelMismatch {
        expected: ObjectKind,
        call: Call<Value>,
    },
}

impl<Value> Error<Value> {
    /// `true` if the error is a refusal to decide rather than a verdict.
    #[must_use]
    pub const fn is_unclassifiable(&self) -> bool {
        matches!(self, Self::Unclassifiable(_))
    }
}

impl<Value: Display> Display for StructuralError<Value> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::MissingWrite { value } => write!(f, "value {value} is never written"),
            Self::MultipleWrites { value } => write!(f, "value {value} is written more than once"),
            Self::ReadBeforeWrite { call } => {
                write!(f, "{call} responds before its value is written")
            }
            Self::CasCycle { value } => {
                write!(f, "compare-and-swap chain through {value} is cyclic")
            }
            Self::SharedCompare { value } => {
                write!(f, "several compare-and-swaps succeed on {value}")
            }
            Self::UnorderedBlocks => write!(f, "blocks admit no real-time order"),
            Self::UnverifiedOrder(violation) => write!(f, "assembled order rejected: {violation}"),
        }
    }
}

impl<Value: Display> Display for Violation<Value> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::NoLinearization => write!(f, "no linearization exists"),
            Self::Straddle { first, second } => {
                write!(f, "calls on {first} and {second} interleave in real time")
            }
            Self::ChainOrder { earlier, later } => {
                write!(f, "{later} is observed before {earlier} in their chain")
            }
            Self::EmptyCandidates { call } => write!(f, "no value can fail {call}"),
            Self::DisjointCandidates { calls } => {
                write!(f, "{} failed compare-and-swaps disagree on the value", calls.len())
            }
            Self::Unordered { call } => write!(f, "{call} is not ordered"),
            Self::DuplicateOrder { order } => write!(f, "order {order} is used twice"),
            Self::Inapplicable { call } => write!(f, "{call} does not apply"),
            Self::RealTime { before, after } => {
                write!(f, "{before} is ordered after {after}")
            }
            Self::ProgramOrder { before, after } => {
                write!(f, "{before} and {after} break program order")
            }
        }
    }
}

impl<Value: Display> Display for Error<Value> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Unclassifiable(err) => write!(f, "unclassifiable: {err}"),
            Self::Infeasible(violation) => write!(f, "not linearizable: {violation}"),
            Self::ModelMismatch { expected, call } => {
                write!(f, "{call} is not a {expected} operation")
            }
        }
    }
}
