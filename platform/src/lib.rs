//! Platform bring-up layer for the multi-hart RISC-V QEMU `virt` machine.
//!
//! Many harts start executing concurrently at power-on. Exactly one of them
//! wins the cold-boot claim and performs the one-time global setup of the
//! shared devices; every hart (the winner included) then runs its own
//! per-hart setup. This crate provides the sequencing and idempotency
//! contract around that race:
//!
//! - [`boot`]: the cold/warm claim and per-hart hardware context
//! - [`sequencer`]: the fixed-order init driver for one hart
//! - [`descriptor`]: the operations table and static facts the firmware
//!   runtime discovers
//! - [`board`]: the QEMU `virt` device layout and the glue binding the
//!   operations table to the device backends in `platform_drivers`
//!
//! The warm-before-cold barrier is the runtime's responsibility; this layer
//! only detects violations (backends report not-ready) and never blocks.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod board;
pub mod boot;
pub mod descriptor;
pub mod error;
pub mod handoff;
pub mod hart;
pub mod logging;
pub mod sequencer;

pub use board::{BoardConfig, QemuVirtPlatform};
pub use boot::{AtomicBootClaim, BootKind, BootLeaderClaim, HartContext};
pub use descriptor::{PlatformDescriptor, PlatformFeatures, PlatformOps, PlatformVersion};
pub use error::PlatformError;
pub use hart::{HartId, IrqLines};
pub use platform_drivers::ResetKind;
pub use sequencer::BootSequencer;
