//! Memory-mapped register access for the platform layer.
//!
//! Device backends never touch raw pointers themselves; they go through an
//! [`MmioBus`], so the same driver code runs against real hardware
//! ([`PhysBus`]) and against the recording [`fake::FakeBus`] in host tests.

#![no_std]

#[cfg(feature = "fake")]
extern crate alloc;

#[cfg(feature = "fake")]
pub mod fake;

/// Width-explicit access to memory-mapped device registers.
///
/// Addresses are physical device addresses. Implementations must perform
/// each access exactly once and must not reorder or coalesce them; device
/// registers have side effects on both reads and writes.
pub trait MmioBus: Send + Sync {
    fn read8(&self, addr: u64) -> u8;
    fn write8(&self, addr: u64, value: u8);

    fn read16(&self, addr: u64) -> u16;
    fn write16(&self, addr: u64, value: u16);

    fn read32(&self, addr: u64) -> u32;
    fn write32(&self, addr: u64, value: u32);

    fn read64(&self, addr: u64) -> u64;
    fn write64(&self, addr: u64, value: u64);
}

/// Bus implementation backed by volatile loads and stores to physical
/// addresses, for use on the target machine where device memory is
/// identity-accessible.
#[derive(Debug, Clone, Copy)]
pub struct PhysBus {
    _private: (),
}

impl PhysBus {
    /// # Safety
    /// The caller must guarantee that every address later passed to this bus
    /// maps a device register of the accessed width, and that accessing it
    /// is sound in the current execution mode. A wrong base address is a
    /// silent hang or a hardware fault, not a reported error.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

macro_rules! phys_access {
    ($read:ident, $write:ident, $ty:ty) => {
        fn $read(&self, addr: u64) -> $ty {
            // SAFETY: The constructor contract guarantees `addr` is a valid
            // device register of this width.
            unsafe { core::ptr::read_volatile(addr as usize as *const $ty) }
        }

        fn $write(&self, addr: u64, value: $ty) {
            // SAFETY: Same contract as the read side.
            unsafe { core::ptr::write_volatile(addr as usize as *mut $ty, value) }
        }
    };
}

impl MmioBus for PhysBus {
    phys_access!(read8, write8, u8);
    phys_access!(read16, write16, u16);
    phys_access!(read32, write32, u32);
    phys_access!(read64, write64, u64);
}
