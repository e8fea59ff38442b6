use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use self::error::Error;
use self::generic::linearize_generic;
use self::register::linearize_register;
use crate::history::types::{History, ObjectKind};
use crate::model::{QueueState, RegisterState};

pub mod error;
pub mod generic;
pub mod register;
pub mod verify;
pub mod witness;

pub use verify::verify_order;
pub use witness::Witness;

/// Linearization engines.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Engine {
    /// Register engine for register histories, falling back to the generic
    /// engine when the history is unclassifiable; generic engine otherwise.
    #[default]
    Auto,
    /// Exhaustive search returning every linearization.
    Generic,
    /// Interval-based register engine returning one linearization.
    Register,
}

/// Check whether `history` is linearizable.
///
/// The object is inferred from the calls: enqueue/dequeue histories are
/// checked against a FIFO queue, write/read/compare-and-swap histories
/// against a register that starts empty.
///
/// On success, returns a [`Witness`]:
///
/// - [`Witness::RegisterOrder`] -- from the register engine. The input
///   history with an order assigned to every call.
/// - [`Witness::Linearizations`] -- from the generic engine. Every valid
///   linearization.
///
/// An empty history is trivially linearizable.
///
/// # Errors
///
/// Returns [`Error::Infeasible`](error::Error::Infeasible) if the history
/// is not linearizable.
///
/// Returns [`Error::Unclassifiable`](error::Error::Unclassifiable) only
/// for [`Engine::Register`]; [`Engine::Auto`] answers those histories with
/// the generic engine.
///
/// Returns [`Error::ModelMismatch`](error::Error::ModelMismatch) if the
/// history mixes queue and register calls, or if [`Engine::Register`] is
/// asked to check a queue.
pub fn check<Value>(history: &History<Value>, engine: Engine) -> Result<Witness<Value>, Error<Value>>
where
    Value: Clone + Eq + Hash + Ord + Debug,
{
    tracing::debug!(calls = history.len(), ?engine, "checking linearizability");

    let kind = history.object_kind()?;
    match (engine, kind) {
        (Engine::Register, _) => linearize_register(history).map(Witness::RegisterOrder),
        (Engine::Auto, Some(ObjectKind::Register)) => match linearize_register(history) {
            Err(err) if err.is_unclassifiable() => {
                tracing::debug!(?err, "register engine declined, falling back to generic engine");
                generic(history, ObjectKind::Register)
            }
            result => result.map(Witness::RegisterOrder),
        },
        (_, kind) => generic(history, kind.unwrap_or(ObjectKind::Register)),
    }
}

fn generic<Value>(history: &History<Value>, kind: ObjectKind) -> Result<Witness<Value>, Error<Value>>
where
    Value: Clone + Eq + Hash + Ord + Debug,
{
    let orders: Vec<History<Value>> = match kind {
        ObjectKind::Queue => linearize_generic(history, &QueueState::default())?,
        ObjectKind::Register => linearize_generic(history, &RegisterState::default())?,
    };
    Ok(Witness::Linearizations(orders))
}
