//! Linearizability checking for concurrent histories.
//!
//! `lincheck_core` decides whether a recorded history of calls on a shared
//! object is *linearizable*: whether some total order of the calls respects
//! every call's invocation/response window, keeps each thread's program
//! order, and is accepted step by step by a sequential model of the object.
//!
//! Two engines share one data model:
//!
//! 1. **Generic engine** ([`consistency::generic`]) -- exhaustive
//!    backtracking over any [`SequentialObject`](model::SequentialObject).
//!    Returns every linearization. Exponential in the worst case; used for
//!    queues and as the reference for the register engine.
//! 2. **Register engine** ([`consistency::register`]) -- write, read and
//!    compare-and-swap histories in which every value is stored once. Orders
//!    per-value lifetimes through interval reasoning, compare-and-swap
//!    chains and candidate sets for failed compare-and-swaps, without
//!    searching. It may decline a history it cannot classify but never
//!    accepts a non-linearizable one.
//!
//! # Entry point
//!
//! The main entry point is [`check()`], which takes a [`History`] and an
//! [`Engine`], and returns either a [`Witness`] holding a linearization, or
//! an [`Error`](consistency::error::Error) explaining the rejection.
//!
//! ```rust
//! use lincheck_core::history::types::{Call, History};
//! use lincheck_core::{check, Engine};
//!
//! let history = History::new(vec![
//!     Call::write(1, 1u64, 0.0, 2.0),
//!     Call::read(2, 1, 0.0, 2.0),
//! ]);
//! let witness = check(&history, Engine::Auto).expect("linearizable");
//! assert_eq!(witness.count(), 1);
//! ```
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` derives on core types
//!   (`History`, `Call`, `Witness`, `Error`, `Engine`).
//! - **`schemars`** -- derives `JsonSchema` for the history input format.
//!
//! This crate is `no_std` compatible (requires `alloc`). The text format
//! parser lives in the separate `lincheck_parser` crate.

#![cfg_attr(not(any(test, feature = "schemars")), no_std)]
extern crate alloc;

pub mod consistency;
pub mod graph;
pub mod history;
pub mod model;

pub use consistency::{check, Engine, Witness};
pub use history::types::{Call, History, Operation};
