//! Random call histories for exercising the linearizability engines.
//!
//! [`generator`] produces register and queue histories with the timing
//! shape of a real multi-threaded run; [`predicates`] classifies them.

pub mod generator;
pub mod predicates;
