//! # Domain Layer
//!
//! Stream descriptions and the history fold. No I/O.

pub mod history;
pub mod stream;

pub use history::*;
pub use stream::*;
