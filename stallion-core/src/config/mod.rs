//! Configuration types
//!
//! Per-axis settings read from the settings store, and per-driver options
//! fixed at construction.

pub mod axis;
pub mod options;

pub use axis::*;
pub use options::*;
