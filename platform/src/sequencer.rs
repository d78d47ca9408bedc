//! Per-hart boot sequencer.

use crate::boot::{BootKind, BootLeaderClaim};
use crate::descriptor::PlatformOps;
use crate::error::PlatformError;

/// Drives one hart through the fixed subsystem init order.
///
/// Runs once per hart per boot; per-hart steps are not defended against
/// double invocation, the caller must not re-enter. The sequencer assumes
/// the runtime holds warm harts until cold init has completed (the
/// warm-before-cold barrier lives in the caller, not here).
pub struct BootSequencer<'p, P: PlatformOps + ?Sized> {
    ops: &'p P,
}

impl<'p, P: PlatformOps + ?Sized> BootSequencer<'p, P> {
    #[must_use]
    pub const fn new(ops: &'p P) -> Self {
        Self { ops }
    }

    /// Runs the init sequence for the calling hart.
    ///
    /// Order is fixed and must not change: diagnostics first (no
    /// dependents), console next so later failures are visible, then each
    /// interrupt-delivery subsystem with its global branch strictly before
    /// its per-hart branch, hand-off enrichment last. The first failure
    /// aborts the sequence and is returned unchanged; there is no retry
    /// and no rollback of already-initialized subsystems.
    pub fn boot_hart(&self, kind: BootKind) -> Result<(), PlatformError> {
        self.ops.early_init(kind)?;
        if kind.is_cold() {
            self.ops.console_init()?;
        }
        self.ops.irqchip_init(kind)?;
        self.ops.ipi_init(kind)?;
        self.ops.timer_init(kind)?;
        self.ops.final_init(kind)?;
        Ok(())
    }

    /// Claims boot leadership for the calling hart and runs its sequence,
    /// reporting which role the hart ended up with.
    pub fn boot_with_claim(&self, claim: &dyn BootLeaderClaim) -> Result<BootKind, PlatformError> {
        let kind = claim.claim();
        self.boot_hart(kind)?;
        Ok(kind)
    }
}
