//! Cold/warm boot distinction and per-hart hardware context.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::hart::HartId;

/// Which boot path a hart takes.
///
/// Exactly one hart observes `Cold` per full-system power-on; all others,
/// and the cold hart on any subsequent entry, observe `Warm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootKind {
    /// One-time, system-wide initialization path.
    Cold,
    /// Per-hart path bringing the calling hart's own context online.
    Warm,
}

impl BootKind {
    #[must_use]
    pub fn is_cold(self) -> bool {
        matches!(self, Self::Cold)
    }
}

/// Race-resolution primitive for cold-boot leadership.
///
/// Owned by the runtime and injected into the boot path, so the sequencer
/// stays deterministic and tests can force either outcome.
pub trait BootLeaderClaim: Send + Sync {
    /// The first caller system-wide gets [`BootKind::Cold`]; every other
    /// caller, forever after, gets [`BootKind::Warm`].
    fn claim(&self) -> BootKind;
}

/// Single-writer-wins claim on an atomic boot-leader flag.
#[derive(Debug)]
pub struct AtomicBootClaim {
    claimed: AtomicBool,
}

impl AtomicBootClaim {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
        }
    }
}

impl Default for AtomicBootClaim {
    fn default() -> Self {
        Self::new()
    }
}

impl BootLeaderClaim for AtomicBootClaim {
    fn claim(&self) -> BootKind {
        match self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => BootKind::Cold,
            Err(_) => BootKind::Warm,
        }
    }
}

/// Per-hart hardware state the platform reads but never passes around:
/// the calling hart's identity and the boot-stage hand-off pointer the
/// runtime left in an architecture register.
pub trait HartContext: Send + Sync {
    fn hart_id(&self) -> HartId;

    /// Pointer to the hand-off blob (a devicetree on this machine), if the
    /// runtime supplied one.
    fn handoff_ptr(&self) -> Option<NonNull<u8>>;
}

#[cfg(target_arch = "riscv64")]
mod machine {
    use core::ptr::NonNull;
    use core::sync::atomic::{AtomicUsize, Ordering};

    use crate::hart::HartId;

    use super::HartContext;

    static HANDOFF_ADDR: AtomicUsize = AtomicUsize::new(0);

    /// [`HartContext`] backed by the `mhartid` CSR and the hand-off
    /// address recorded at entry.
    #[derive(Debug, Clone, Copy)]
    pub struct MachineHartContext;

    impl MachineHartContext {
        #[must_use]
        pub const fn new() -> Self {
            Self
        }

        /// Records the hand-off blob address the previous boot stage left
        /// in a register. The runtime's entry path calls this once, on the
        /// cold hart, before the boot sequence runs.
        pub fn record_handoff(addr: usize) {
            HANDOFF_ADDR.store(addr, Ordering::Release);
        }
    }

    impl Default for MachineHartContext {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HartContext for MachineHartContext {
        fn hart_id(&self) -> HartId {
            HartId::new(riscv::register::mhartid::read() as u32)
        }

        fn handoff_ptr(&self) -> Option<NonNull<u8>> {
            NonNull::new(HANDOFF_ADDR.load(Ordering::Acquire) as *mut u8)
        }
    }
}

#[cfg(target_arch = "riscv64")]
pub use machine::MachineHartContext;
