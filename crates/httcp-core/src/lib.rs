//! # httcp-core
//!
//! Shared building blocks for the httcp H→ττ analysis crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub use error::{Error, Result};

/// Crate version, stamped into emitted artifacts.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
