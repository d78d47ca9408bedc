//! Recording in-memory bus for host tests.
//!
//! Registers read back whatever was last written (or preloaded), and every
//! access is appended to an ordered log so tests can assert both the values
//! a driver programmed and the order it programmed them in.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use spin::Mutex;

use crate::MmioBus;

/// One bus access, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read { addr: u64, width: u8 },
    Write { addr: u64, width: u8, value: u64 },
}

impl Access {
    #[must_use]
    pub fn addr(&self) -> u64 {
        match *self {
            Self::Read { addr, .. } | Self::Write { addr, .. } => addr,
        }
    }

    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

/// In-memory [`MmioBus`] with an access log.
#[derive(Debug, Default)]
pub struct FakeBus {
    cells: Mutex<BTreeMap<u64, u64>>,
    log: Mutex<Vec<Access>>,
}

impl FakeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a register value without recording an access, e.g. to make a
    /// status register report ready before the driver polls it.
    pub fn preload(&self, addr: u64, value: u64) {
        self.cells.lock().insert(addr, value);
    }

    /// Last value written (or preloaded) at `addr`, if any.
    #[must_use]
    pub fn value(&self, addr: u64) -> Option<u64> {
        self.cells.lock().get(&addr).copied()
    }

    /// Snapshot of the full access log.
    #[must_use]
    pub fn accesses(&self) -> Vec<Access> {
        self.log.lock().clone()
    }

    /// All writes, as `(addr, value)` in program order.
    #[must_use]
    pub fn writes(&self) -> Vec<(u64, u64)> {
        self.log
            .lock()
            .iter()
            .filter_map(|a| match *a {
                Access::Write { addr, value, .. } => Some((addr, value)),
                Access::Read { .. } => None,
            })
            .collect()
    }

    /// Writes whose address falls within `range`, in program order.
    #[must_use]
    pub fn writes_in(&self, range: core::ops::Range<u64>) -> Vec<(u64, u64)> {
        self.writes()
            .into_iter()
            .filter(|(addr, _)| range.contains(addr))
            .collect()
    }

    /// Log position of the first write within `range`, for ordering
    /// assertions across register blocks.
    #[must_use]
    pub fn first_write_in(&self, range: core::ops::Range<u64>) -> Option<usize> {
        self.log.lock().iter().position(|a| match *a {
            Access::Write { addr, .. } => range.contains(&addr),
            Access::Read { .. } => false,
        })
    }

    fn record_read(&self, addr: u64, width: u8) -> u64 {
        self.log.lock().push(Access::Read { addr, width });
        self.cells.lock().get(&addr).copied().unwrap_or(0)
    }

    fn record_write(&self, addr: u64, width: u8, value: u64) {
        self.log.lock().push(Access::Write { addr, width, value });
        self.cells.lock().insert(addr, value);
    }
}

macro_rules! fake_access {
    ($read:ident, $write:ident, $ty:ty, $width:expr) => {
        fn $read(&self, addr: u64) -> $ty {
            self.record_read(addr, $width) as $ty
        }

        fn $write(&self, addr: u64, value: $ty) {
            self.record_write(addr, $width, value as u64);
        }
    };
}

impl MmioBus for FakeBus {
    fake_access!(read8, write8, u8, 1);
    fake_access!(read16, write16, u16, 2);
    fake_access!(read32, write32, u32, 4);
    fake_access!(read64, write64, u64, 8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_default_to_zero() {
        let bus = FakeBus::new();
        assert_eq!(0, bus.read32(0x1000));
    }

    #[test]
    fn writes_are_readable_and_logged() {
        let bus = FakeBus::new();
        bus.write32(0x1000, 0xdead_beef);
        assert_eq!(0xdead_beef, bus.read32(0x1000));
        assert_eq!(
            &[
                Access::Write { addr: 0x1000, width: 4, value: 0xdead_beef },
                Access::Read { addr: 0x1000, width: 4 },
            ],
            &bus.accesses()[..]
        );
    }

    #[test]
    fn preload_does_not_log() {
        let bus = FakeBus::new();
        bus.preload(0x10, 0x20);
        assert!(bus.accesses().is_empty());
        assert_eq!(0x20, bus.read8(0x10) as u64);
    }

    #[test]
    fn ordering_helpers() {
        let bus = FakeBus::new();
        bus.write32(0x100, 1);
        bus.write32(0x200, 2);
        bus.write32(0x110, 3);
        assert_eq!(Some(0), bus.first_write_in(0x100..0x200));
        assert_eq!(Some(1), bus.first_write_in(0x200..0x300));
        assert_eq!(None, bus.first_write_in(0x300..0x400));
        assert_eq!(&[(0x100, 1), (0x110, 3)], &bus.writes_in(0x100..0x200)[..]);
    }
}
