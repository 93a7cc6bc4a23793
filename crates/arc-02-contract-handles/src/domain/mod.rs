//! # Domain Layer
//!
//! Handle identity types. No I/O.

pub mod handle;

pub use handle::*;
