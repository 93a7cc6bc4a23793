//! # Domain Layer
//!
//! Step estimation and context state. No I/O and no bus access here;
//! publishing lives in `service`.

pub mod context;
pub mod estimate;

pub use context::*;
pub use estimate::*;
