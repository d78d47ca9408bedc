//! The ABI surface the firmware runtime discovers: an operations table and
//! a read-only set of platform facts.
//!
//! The original scheme here is a table of raw function pointers validated
//! at runtime. Binding the operations as trait methods moves the
//! "every slot populated" invariant into the type system: a platform with
//! an unbound operation cannot be constructed at all.

use bitflags::bitflags;
use platform_drivers::ResetKind;

use crate::boot::BootKind;
use crate::error::PlatformError;
use crate::hart::HartId;

/// Default per-hart stack size handed to the runtime.
pub const DEFAULT_HART_STACK_SIZE: usize = 8 * 1024;

bitflags! {
    /// Capabilities a platform advertises to the runtime.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PlatformFeatures: u32 {
        /// A readable free-running timer value.
        const TIMER_VALUE = 1 << 0;
        /// Cross-hart software interrupts.
        const IPI = 1 << 1;
        /// A routed external interrupt controller.
        const IRQCHIP = 1 << 2;
        /// A reset/shutdown device.
        const SYSTEM_RESET = 1 << 3;
    }
}

impl PlatformFeatures {
    pub const DEFAULT: Self = Self::all();
}

/// Packed `major.minor` platform version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformVersion {
    major: u16,
    minor: u16,
}

impl PlatformVersion {
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    #[must_use]
    pub const fn encode(self) -> u32 {
        (self.major as u32) << 16 | self.minor as u32
    }

    #[must_use]
    pub const fn major(self) -> u16 {
        self.major
    }

    #[must_use]
    pub const fn minor(self) -> u16 {
        self.minor
    }
}

/// Operations table: one required method per slot.
///
/// The `*_init` operations take the calling hart's [`BootKind`] and run
/// their global branch on [`BootKind::Cold`] only; the calling hart's
/// identity is read from hardware state, never passed in. All other
/// operations are per-hart or stateless and valid only after init.
pub trait PlatformOps {
    /// First init step; on cold boot, brings up the reset/diagnostics
    /// device (no dependents, no ordering requirement).
    fn early_init(&self, kind: BootKind) -> Result<(), PlatformError>;

    /// Last init step; on cold boot, best-effort hand-off enrichment.
    /// Defined to always succeed: a missing or malformed hand-off blob
    /// means nothing to enrich, not an error.
    fn final_init(&self, kind: BootKind) -> Result<(), PlatformError>;

    /// One-time console setup, cold boot only.
    fn console_init(&self) -> Result<(), PlatformError>;

    /// Transmits one byte. Concurrent callers are allowed; interleaving
    /// across harts is unspecified.
    fn console_putc(&self, byte: u8);

    /// Non-blocking receive; `None` means no byte pending.
    fn console_getc(&self) -> Option<u8>;

    /// Interrupt-router init: global routing capacity on cold, then the
    /// calling hart's two delivery contexts.
    fn irqchip_init(&self, kind: BootKind) -> Result<(), PlatformError>;

    /// Cross-hart signaling init: shared device on cold, then the calling
    /// hart's channel.
    fn ipi_init(&self, kind: BootKind) -> Result<(), PlatformError>;

    /// Raises the software interrupt of `target`.
    fn ipi_send(&self, target: HartId);

    /// Clears the calling hart's software interrupt.
    fn ipi_clear(&self);

    /// Timer init: shared device on cold, then the calling hart's
    /// comparator.
    fn timer_init(&self, kind: BootKind) -> Result<(), PlatformError>;

    /// Current timer value.
    fn timer_value(&self) -> u64;

    /// Arms the calling hart's timer for an absolute `deadline`.
    fn timer_event_start(&self, deadline: u64);

    /// Disarms the calling hart's timer.
    fn timer_event_stop(&self);

    /// Resets or powers off the machine. Does not return on success; a
    /// non-zero `reason` on shutdown becomes the exit code.
    fn system_reset(&self, kind: ResetKind, reason: u32) -> !;
}

/// Read-only platform facts plus the bound operations table.
///
/// Constructed once and never mutated; the runtime reads it for the life
/// of the system.
pub struct PlatformDescriptor<'a> {
    pub name: &'a str,
    pub version: PlatformVersion,
    pub hart_count: u32,
    pub hart_stack_size: usize,
    pub features: PlatformFeatures,
    pub ops: &'a dyn PlatformOps,
}
