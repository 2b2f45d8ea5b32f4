//! Collaborator traits
//!
//! These traits define the interface between the driver-mode logic and
//! everything it does not own: the chip register layer, the settings store,
//! the message channel and the motion pipeline.

pub mod diagnostics;
pub mod motion;
pub mod registers;
pub mod settings;

pub use diagnostics::{DiagnosticSink, MsgLevel};
pub use motion::MotionStatusProvider;
pub use registers::{ConnectionStatus, TrinamicRegisters};
pub use settings::AxisConfigProvider;
