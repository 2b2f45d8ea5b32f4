//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in stallion-core for Trinamic SPI stepper drivers:
//!
//! - Register map and shadow registers (TMC2130, TMC5160)
//! - RMS current scaling per chip variant
//! - SPI register transport over `embedded-hal`
//! - The per-axis driver handle with mode switching and diagnostics

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod trinamic;
