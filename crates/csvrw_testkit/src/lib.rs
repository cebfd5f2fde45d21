//! # csvrw Testkit
//!
//! Test utilities for csvrw.
//!
//! This crate provides:
//! - Fixtures for writing records to memory or temporary files and reading
//!   them back
//! - Property-based test generators using proptest
//! - The randomized write/read stress harness used by `csvrw stress`
//!
//! ## Usage
//!
//! ```rust
//! use csvrw_testkit::prelude::*;
//!
//! let records = vec![vec![b"a".to_vec(), b"b\"c".to_vec()]];
//! let bytes = write_to_vec(&records, &CsvLayout::default()).unwrap();
//! assert_eq!(read_from_slice(&bytes, &CsvLayout::default()).unwrap(), records);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
