//! CLI command implementations.

pub mod print;
pub mod stress;
