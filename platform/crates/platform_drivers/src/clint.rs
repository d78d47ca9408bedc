//! CLINT-style cross-hart signaling and timer backend.
//!
//! One physical device, two logically separate capabilities:
//! - IPI: one MSIP word per hart at `base + 4 * hart`
//! - timer: one MTIMECMP comparator per hart at `base + 0x4000 + 8 * hart`,
//!   and the free-running MTIME counter at `base + 0xbff8`
//!
//! Each capability has its own cold/warm lifecycle so a platform can wire
//! them to separate operations-table slots.

use conquer_once::spin::OnceCell;
use platform_mmio::MmioBus;

use crate::DriverError;

/// Hart capacity of the register layout.
pub const CLINT_MAX_HARTS: u32 = 4095;

const MSIP_BASE: u64 = 0x0;
const MTIMECMP_BASE: u64 = 0x4000;
const MTIME_OFFSET: u64 = 0xbff8;

/// Comparator value that can never fire.
const MTIMECMP_DISARMED: u64 = u64::MAX;

#[derive(Debug)]
struct IpiState {
    base: u64,
    hart_count: u32,
}

#[derive(Debug)]
struct TimerState {
    base: u64,
    hart_count: u32,
    has_mtime: bool,
}

/// Cross-hart signaling / timer backend over an MMIO bus.
pub struct Clint<'b, B: MmioBus> {
    bus: &'b B,
    ipi: OnceCell<IpiState>,
    timer: OnceCell<TimerState>,
}

impl<'b, B: MmioBus> Clint<'b, B> {
    #[must_use]
    pub const fn new(bus: &'b B) -> Self {
        Self {
            bus,
            ipi: OnceCell::uninit(),
            timer: OnceCell::uninit(),
        }
    }

    /// Global one-time IPI setup: records the layout and clears every
    /// hart's pending software interrupt.
    pub fn cold_ipi_init(&self, base: u64, hart_count: u32) -> Result<(), DriverError> {
        if hart_count > CLINT_MAX_HARTS {
            return Err(DriverError::TooManyHarts {
                requested: hart_count,
                supported: CLINT_MAX_HARTS,
            });
        }

        self.ipi
            .try_init_once(|| IpiState { base, hart_count })
            .map_err(|_| DriverError::AlreadyInitialized)?;

        for hart in 0..hart_count {
            self.bus.write32(Self::msip_addr(base, hart), 0);
        }

        log::info!("clint: cold ipi init at {base:#x}, {hart_count} harts");
        Ok(())
    }

    /// Per-hart IPI setup: starts the calling hart with no pending signal.
    pub fn warm_ipi_init(&self, hart: u32) -> Result<(), DriverError> {
        self.ipi_clear(hart)
    }

    /// Raises the software interrupt of `target`.
    pub fn ipi_send(&self, target: u32) -> Result<(), DriverError> {
        let state = self.ipi.get().ok_or(DriverError::NotReady)?;
        Self::check_hart(target, state.hart_count)?;
        self.bus.write32(Self::msip_addr(state.base, target), 1);
        Ok(())
    }

    /// Clears the software interrupt of `hart`.
    pub fn ipi_clear(&self, hart: u32) -> Result<(), DriverError> {
        let state = self.ipi.get().ok_or(DriverError::NotReady)?;
        Self::check_hart(hart, state.hart_count)?;
        self.bus.write32(Self::msip_addr(state.base, hart), 0);
        Ok(())
    }

    /// Global one-time timer setup: records the layout and disarms every
    /// hart's comparator. `has_mtime` is false on devices without a
    /// readable counter; [`Self::timer_value`] then reports 0.
    pub fn cold_timer_init(
        &self,
        base: u64,
        hart_count: u32,
        has_mtime: bool,
    ) -> Result<(), DriverError> {
        if hart_count > CLINT_MAX_HARTS {
            return Err(DriverError::TooManyHarts {
                requested: hart_count,
                supported: CLINT_MAX_HARTS,
            });
        }

        self.timer
            .try_init_once(|| TimerState {
                base,
                hart_count,
                has_mtime,
            })
            .map_err(|_| DriverError::AlreadyInitialized)?;

        for hart in 0..hart_count {
            self.bus
                .write64(Self::mtimecmp_addr(base, hart), MTIMECMP_DISARMED);
        }

        log::info!("clint: cold timer init at {base:#x}, {hart_count} harts, mtime={has_mtime}");
        Ok(())
    }

    /// Per-hart timer setup: starts the calling hart with no armed event.
    pub fn warm_timer_init(&self, hart: u32) -> Result<(), DriverError> {
        self.timer_event_stop(hart)
    }

    /// Current counter value, or 0 when the device has no readable counter.
    pub fn timer_value(&self) -> Result<u64, DriverError> {
        let state = self.timer.get().ok_or(DriverError::NotReady)?;
        if !state.has_mtime {
            return Ok(0);
        }
        Ok(self.bus.read64(state.base + MTIME_OFFSET))
    }

    /// Arms the comparator of `hart` for an absolute `deadline`.
    pub fn timer_event_start(&self, hart: u32, deadline: u64) -> Result<(), DriverError> {
        let state = self.timer.get().ok_or(DriverError::NotReady)?;
        Self::check_hart(hart, state.hart_count)?;
        self.bus.write64(Self::mtimecmp_addr(state.base, hart), deadline);
        Ok(())
    }

    /// Disarms the comparator of `hart`.
    pub fn timer_event_stop(&self, hart: u32) -> Result<(), DriverError> {
        let state = self.timer.get().ok_or(DriverError::NotReady)?;
        Self::check_hart(hart, state.hart_count)?;
        self.bus
            .write64(Self::mtimecmp_addr(state.base, hart), MTIMECMP_DISARMED);
        Ok(())
    }

    fn check_hart(hart: u32, hart_count: u32) -> Result<(), DriverError> {
        if hart >= hart_count {
            return Err(DriverError::HartOutOfRange { hart, hart_count });
        }
        Ok(())
    }

    fn msip_addr(base: u64, hart: u32) -> u64 {
        base + MSIP_BASE + 4 * u64::from(hart)
    }

    fn mtimecmp_addr(base: u64, hart: u32) -> u64 {
        base + MTIMECMP_BASE + 8 * u64::from(hart)
    }
}

#[cfg(test)]
mod tests {
    use platform_mmio::fake::FakeBus;

    use super::*;

    const BASE: u64 = 0x200_0000;

    fn cold_clint(bus: &FakeBus) -> Clint<'_, FakeBus> {
        let clint = Clint::new(bus);
        clint.cold_ipi_init(BASE, 8).unwrap();
        clint.cold_timer_init(BASE, 8, true).unwrap();
        clint
    }

    #[test]
    fn cold_ipi_init_clears_every_msip_word() {
        let bus = FakeBus::new();
        let clint = Clint::new(&bus);
        clint.cold_ipi_init(BASE, 8).unwrap();

        let writes = bus.writes();
        assert_eq!(8, writes.len());
        for (hart, &(addr, value)) in writes.iter().enumerate() {
            assert_eq!(BASE + 4 * hart as u64, addr);
            assert_eq!(0, value);
        }
    }

    #[test]
    fn cold_timer_init_disarms_every_comparator() {
        let bus = FakeBus::new();
        let clint = Clint::new(&bus);
        clint.cold_timer_init(BASE, 8, true).unwrap();

        for hart in 0..8u64 {
            assert_eq!(Some(u64::MAX), bus.value(BASE + 0x4000 + 8 * hart));
        }
    }

    #[test]
    fn ipi_send_and_clear_target_the_right_msip_words() {
        let bus = FakeBus::new();
        let clint = cold_clint(&bus);

        clint.ipi_send(5).unwrap();
        assert_eq!(Some(1), bus.value(BASE + 4 * 5));

        clint.ipi_clear(5).unwrap();
        assert_eq!(Some(0), bus.value(BASE + 4 * 5));
    }

    #[test]
    fn ipi_send_rejects_out_of_range_hart() {
        let bus = FakeBus::new();
        let clint = cold_clint(&bus);
        assert_eq!(
            Err(DriverError::HartOutOfRange { hart: 8, hart_count: 8 }),
            clint.ipi_send(8)
        );
    }

    #[test]
    fn ops_before_cold_init_fail() {
        let bus = FakeBus::new();
        let clint = Clint::new(&bus);
        assert_eq!(Err(DriverError::NotReady), clint.warm_ipi_init(0));
        assert_eq!(Err(DriverError::NotReady), clint.warm_timer_init(0));
        assert_eq!(Err(DriverError::NotReady), clint.timer_value());
        assert!(bus.accesses().is_empty());
    }

    #[test]
    fn timer_value_reads_mtime() {
        let bus = FakeBus::new();
        bus.preload(BASE + 0xbff8, 0x1234_5678_9abc_def0);
        let clint = cold_clint(&bus);
        assert_eq!(Ok(0x1234_5678_9abc_def0), clint.timer_value());
    }

    #[test]
    fn timer_value_is_zero_without_mtime() {
        let bus = FakeBus::new();
        bus.preload(BASE + 0xbff8, 42);
        let clint = Clint::new(&bus);
        clint.cold_timer_init(BASE, 8, false).unwrap();
        assert_eq!(Ok(0), clint.timer_value());
    }

    #[test]
    fn timer_event_start_and_stop() {
        let bus = FakeBus::new();
        let clint = cold_clint(&bus);

        clint.timer_event_start(3, 0xdead).unwrap();
        assert_eq!(Some(0xdead), bus.value(BASE + 0x4000 + 8 * 3));

        clint.timer_event_stop(3).unwrap();
        assert_eq!(Some(u64::MAX), bus.value(BASE + 0x4000 + 8 * 3));
    }

    #[test]
    fn ipi_and_timer_cold_inits_are_independent() {
        let bus = FakeBus::new();
        let clint = Clint::new(&bus);
        clint.cold_ipi_init(BASE, 8).unwrap();
        // IPI is up, timer is not.
        assert_eq!(Err(DriverError::NotReady), clint.warm_timer_init(0));
        clint.warm_ipi_init(0).unwrap();
    }
}
