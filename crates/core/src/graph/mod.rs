pub mod digraph;
pub mod ugraph;
