//! Benchmark support for csvrw.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
