//! Cold-boot hand-off enrichment.
//!
//! The previous boot stage leaves a pointer to a hand-off blob (a
//! devicetree on this machine) in an architecture register. The cold hart
//! inspects it late in the sequence and enriches the next stage's view of
//! the topology. This step is best-effort: a missing or unreadable blob
//! means there is nothing to enrich, never an error.

use core::ptr::NonNull;

/// Inspects the hand-off blob and reports discovered topology, warning
/// when it disagrees with the platform's static hart count.
pub fn enrich(handoff: Option<NonNull<u8>>, expected_harts: u32) {
    let Some(blob) = handoff else {
        log::info!("handoff: no blob supplied, nothing to enrich");
        return;
    };

    // SAFETY: The runtime passed this pointer as the boot-stage hand-off
    // blob; the parser validates the header before reading further.
    let tree = match unsafe { fdt::Fdt::from_ptr(blob.as_ptr()) } {
        Ok(tree) => tree,
        Err(err) => {
            log::info!("handoff: blob is not a devicetree ({err}), nothing to enrich");
            return;
        }
    };

    let cpus = tree.cpus().count() as u32;
    log::info!(
        "handoff: devicetree \"{}\", {} cpus, {} bytes",
        tree.root().model(),
        cpus,
        tree.total_size()
    );
    if cpus != expected_harts {
        log::warn!("handoff: devicetree reports {cpus} cpus, platform expects {expected_harts}");
    }
}
