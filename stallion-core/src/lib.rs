//! Board-agnostic core logic for Trinamic stepper drivers
//!
//! This crate contains all logic that does not depend on a specific
//! driver chip or bus implementation:
//!
//! - Collaborator traits (register interface, settings, diagnostics)
//! - Axis configuration types
//! - Operating mode selection (StealthChop / CoolStep / StallGuard homing)
//! - Step-time threshold math for StallGuard homing windows

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod mode;
pub mod traits;
pub mod tstep;
