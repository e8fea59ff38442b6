pub mod display;
pub mod interval;
pub mod types;
