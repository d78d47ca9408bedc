//! Device backends for the QEMU `virt` platform layer.
//!
//! Each backend programs one memory-mapped device through an injected
//! [`platform_mmio::MmioBus`] and follows the same lifecycle: a `cold_*`
//! init that configures the shared device exactly once system-wide, and a
//! `warm_*` init that brings one hart's channel online. Cold state is held
//! in a `OnceCell`, so a second cold init and a warm init that races ahead
//! of cold init both surface as errors instead of stray register writes.

#![no_std]

mod error;

pub mod clint;
pub mod plic;
pub mod uart8250;

pub use clint::Clint;
pub use error::DriverError;
pub use plic::Plic;
pub use sifive_test::{ResetKind, SifiveTest};
pub use uart8250::Uart8250;
