//! Board-specific device layouts and operations-table wiring.

pub mod qemu_virt;

pub use qemu_virt::{BoardConfig, QemuVirtPlatform};
