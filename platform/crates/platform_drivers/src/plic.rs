//! PLIC-style interrupt router backend.
//!
//! Register layout (offsets from the device base):
//! - `0x0000 + 4 * source`: per-source priority
//! - `0x2000 + 0x80 * context + 4 * word`: per-context enable words
//! - `0x200000 + 0x1000 * context`: per-context priority threshold
//!
//! Cold init sizes the router and gives every source a default priority;
//! warm init brings one hart's two delivery contexts to a known, fully
//! masked state. The runtime opens individual sources later.

use conquer_once::spin::OnceCell;
use platform_mmio::MmioBus;

use crate::DriverError;

/// Highest usable source id; source 0 is reserved by the hardware.
pub const PLIC_MAX_SOURCES: u32 = 1023;
/// Delivery context capacity of the register layout.
pub const PLIC_MAX_CONTEXTS: u32 = 15872;

const PRIORITY_BASE: u64 = 0x0;
const ENABLE_BASE: u64 = 0x2000;
const ENABLE_STRIDE: u64 = 0x80;
const THRESHOLD_BASE: u64 = 0x20_0000;
const THRESHOLD_STRIDE: u64 = 0x1000;

/// All-sources-masked threshold value.
const THRESHOLD_MASKED: u32 = 0x7;
const DEFAULT_PRIORITY: u32 = 1;

#[derive(Debug)]
struct PlicState {
    base: u64,
    num_sources: u32,
    num_contexts: u32,
}

/// Interrupt router backend over an MMIO bus.
pub struct Plic<'b, B: MmioBus> {
    bus: &'b B,
    state: OnceCell<PlicState>,
}

impl<'b, B: MmioBus> Plic<'b, B> {
    #[must_use]
    pub const fn new(bus: &'b B) -> Self {
        Self {
            bus,
            state: OnceCell::uninit(),
        }
    }

    /// Global one-time setup: records the routing capacity and programs a
    /// default priority for every source. Must complete before any hart's
    /// [`Self::warm_init`].
    pub fn cold_init(&self, base: u64, num_sources: u32, num_harts: u32) -> Result<(), DriverError> {
        if num_sources > PLIC_MAX_SOURCES {
            return Err(DriverError::TooManySources {
                requested: num_sources,
                supported: PLIC_MAX_SOURCES,
            });
        }
        // Two delivery contexts per hart (see `warm_init`).
        let num_contexts = num_harts * 2;
        if num_contexts > PLIC_MAX_CONTEXTS {
            return Err(DriverError::TooManyContexts {
                requested: num_contexts,
                supported: PLIC_MAX_CONTEXTS,
            });
        }

        self.state
            .try_init_once(|| PlicState {
                base,
                num_sources,
                num_contexts,
            })
            .map_err(|_| DriverError::AlreadyInitialized)?;

        for source in 1..=num_sources {
            self.bus
                .write32(base + PRIORITY_BASE + 4 * u64::from(source), DEFAULT_PRIORITY);
        }

        log::info!("plic: cold init at {base:#x}, {num_sources} sources, {num_contexts} contexts");
        Ok(())
    }

    /// Per-hart setup for one hart's `(signal, timer)` context pair: clears
    /// every enable word of both contexts and masks both thresholds.
    pub fn warm_init(&self, hart: u32, signal_ctx: u32, timer_ctx: u32) -> Result<(), DriverError> {
        let state = self.state.get().ok_or(DriverError::NotReady)?;

        for context in [signal_ctx, timer_ctx] {
            if context >= state.num_contexts {
                return Err(DriverError::ContextOutOfRange {
                    context,
                    capacity: state.num_contexts,
                });
            }
        }

        let enable_words = state.num_sources / 32 + 1;
        for context in [signal_ctx, timer_ctx] {
            let enable_base = state.base + ENABLE_BASE + u64::from(context) * ENABLE_STRIDE;
            for word in 0..enable_words {
                self.bus.write32(enable_base + 4 * u64::from(word), 0);
            }
        }
        for context in [signal_ctx, timer_ctx] {
            let threshold = state.base + THRESHOLD_BASE + u64::from(context) * THRESHOLD_STRIDE;
            self.bus.write32(threshold, THRESHOLD_MASKED);
        }

        log::trace!("plic: warm init for hart {hart}, contexts ({signal_ctx}, {timer_ctx})");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use platform_mmio::fake::FakeBus;

    use super::*;

    const BASE: u64 = 0xc00_0000;

    #[test]
    fn cold_init_programs_every_source_priority() {
        let bus = FakeBus::new();
        let plic = Plic::new(&bus);
        plic.cold_init(BASE, 127, 8).unwrap();

        let writes = bus.writes();
        assert_eq!(127, writes.len());
        assert_eq!((BASE + 4, 1), writes[0]);
        assert_eq!((BASE + 4 * 127, 1), writes[126]);
    }

    #[test]
    fn cold_init_rejects_too_many_sources() {
        let bus = FakeBus::new();
        let plic = Plic::new(&bus);
        assert_eq!(
            Err(DriverError::TooManySources { requested: 1024, supported: 1023 }),
            plic.cold_init(BASE, 1024, 8)
        );
        assert!(bus.accesses().is_empty());
    }

    #[test]
    fn cold_init_twice_fails() {
        let bus = FakeBus::new();
        let plic = Plic::new(&bus);
        plic.cold_init(BASE, 127, 8).unwrap();
        assert_eq!(Err(DriverError::AlreadyInitialized), plic.cold_init(BASE, 127, 8));
    }

    #[test]
    fn warm_init_before_cold_init_fails() {
        let bus = FakeBus::new();
        let plic = Plic::new(&bus);
        assert_eq!(Err(DriverError::NotReady), plic.warm_init(0, 0, 1));
        assert!(bus.accesses().is_empty());
    }

    #[test]
    fn warm_init_masks_both_contexts() {
        let bus = FakeBus::new();
        let plic = Plic::new(&bus);
        plic.cold_init(BASE, 127, 8).unwrap();

        plic.warm_init(3, 6, 7).unwrap();

        // 127 sources -> 4 enable words per context.
        for context in [6u64, 7u64] {
            let enable_base = BASE + ENABLE_BASE + context * ENABLE_STRIDE;
            let writes = bus.writes_in(enable_base..enable_base + ENABLE_STRIDE);
            assert_eq!(4, writes.len());
            assert!(writes.iter().all(|&(_, value)| value == 0));

            let threshold = BASE + THRESHOLD_BASE + context * THRESHOLD_STRIDE;
            assert_eq!(Some(u64::from(THRESHOLD_MASKED)), bus.value(threshold));
        }
    }

    #[test]
    fn warm_init_rejects_context_beyond_capacity() {
        let bus = FakeBus::new();
        let plic = Plic::new(&bus);
        plic.cold_init(BASE, 127, 8).unwrap();
        // 8 harts -> 16 contexts; context 16 is the first invalid one.
        assert_eq!(
            Err(DriverError::ContextOutOfRange { context: 16, capacity: 16 }),
            plic.warm_init(8, 16, 17)
        );
    }
}
