//! QEMU `virt` machine platform.
//!
//! Binds the operations table to the four device backends over one MMIO
//! bus. Every `*_init` slot runs its global branch on cold boot and then
//! the calling hart's warm branch, exactly the cold-before-warm discipline
//! the sequencer's ordering guarantees system-wide.

use platform_drivers::{Clint, Plic, ResetKind, SifiveTest, Uart8250};
use platform_mmio::MmioBus;

use crate::boot::{BootKind, HartContext};
use crate::descriptor::{
    DEFAULT_HART_STACK_SIZE, PlatformDescriptor, PlatformFeatures, PlatformOps, PlatformVersion,
};
use crate::error::PlatformError;
use crate::handoff;
use crate::hart::{HartId, IrqLines};
use crate::logging::ConsoleSink;

/// Fixed device layout of one machine.
///
/// Constants, not runtime discovery: the addresses must match the target
/// machine's firmware device layout exactly. A mismatch is a silent hang
/// or a hardware fault, not a reported error.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    pub hart_count: u32,
    pub test_addr: u64,
    pub clint_addr: u64,
    pub plic_addr: u64,
    pub plic_num_sources: u32,
    pub plic_num_priorities: u32,
    pub uart_addr: u64,
    /// UART reference clock in Hz.
    pub uart_input_clock: u32,
    pub uart_baudrate: u32,
    pub uart_reg_shift: u32,
    pub uart_reg_width: u32,
}

impl BoardConfig {
    /// The QEMU `virt` machine.
    pub const QEMU_VIRT: Self = Self {
        hart_count: 8,
        test_addr: 0x10_0000,
        clint_addr: 0x200_0000,
        plic_addr: 0xc00_0000,
        plic_num_sources: 127,
        plic_num_priorities: 7,
        uart_addr: 0x1000_0000,
        uart_input_clock: 1_843_200,
        uart_baudrate: 115_200,
        uart_reg_shift: 0,
        uart_reg_width: 1,
    };
}

/// Operations-table implementation for the QEMU `virt` machine.
pub struct QemuVirtPlatform<'b, B: MmioBus, H: HartContext> {
    config: BoardConfig,
    hart: H,
    plic: Plic<'b, B>,
    clint: Clint<'b, B>,
    uart: Uart8250<'b, B>,
    reset: SifiveTest<'b, B>,
}

impl<'b, B: MmioBus, H: HartContext> QemuVirtPlatform<'b, B, H> {
    #[must_use]
    pub const fn new(bus: &'b B, config: BoardConfig, hart: H) -> Self {
        Self {
            config,
            hart,
            plic: Plic::new(bus),
            clint: Clint::new(bus),
            uart: Uart8250::new(bus),
            reset: SifiveTest::new(bus),
        }
    }

    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// The static ABI surface the firmware runtime discovers.
    #[must_use]
    pub fn descriptor(&self) -> PlatformDescriptor<'_> {
        PlatformDescriptor {
            name: "QEMU Virt Machine",
            version: PlatformVersion::new(0, 1),
            hart_count: self.config.hart_count,
            hart_stack_size: DEFAULT_HART_STACK_SIZE,
            features: PlatformFeatures::DEFAULT,
            ops: self,
        }
    }
}

impl<'b, B: MmioBus, H: HartContext> PlatformOps for QemuVirtPlatform<'b, B, H> {
    fn early_init(&self, kind: BootKind) -> Result<(), PlatformError> {
        if !kind.is_cold() {
            return Ok(());
        }
        self.reset.init(self.config.test_addr)?;
        Ok(())
    }

    fn final_init(&self, kind: BootKind) -> Result<(), PlatformError> {
        if !kind.is_cold() {
            return Ok(());
        }
        handoff::enrich(self.hart.handoff_ptr(), self.config.hart_count);
        Ok(())
    }

    fn console_init(&self) -> Result<(), PlatformError> {
        let c = &self.config;
        self.uart.init(
            c.uart_addr,
            c.uart_input_clock,
            c.uart_baudrate,
            c.uart_reg_shift,
            c.uart_reg_width,
        )?;
        Ok(())
    }

    fn console_putc(&self, byte: u8) {
        // Dropped when the console is not up yet; logging the failure
        // would recurse straight back into this path.
        let _ = self.uart.putc(byte);
    }

    fn console_getc(&self) -> Option<u8> {
        self.uart.getc().unwrap_or_default()
    }

    fn irqchip_init(&self, kind: BootKind) -> Result<(), PlatformError> {
        let c = &self.config;
        if kind.is_cold() {
            log::debug!(
                "irqchip: router at {:#x}, {} sources, {} priority levels",
                c.plic_addr,
                c.plic_num_sources,
                c.plic_num_priorities
            );
            self.plic
                .cold_init(c.plic_addr, c.plic_num_sources, c.hart_count)?;
        }
        let hart = self.hart.hart_id();
        let lines = IrqLines::for_hart(hart);
        self.plic.warm_init(hart.raw(), lines.signal, lines.timer)?;
        Ok(())
    }

    fn ipi_init(&self, kind: BootKind) -> Result<(), PlatformError> {
        if kind.is_cold() {
            self.clint
                .cold_ipi_init(self.config.clint_addr, self.config.hart_count)?;
        }
        self.clint.warm_ipi_init(self.hart.hart_id().raw())?;
        Ok(())
    }

    fn ipi_send(&self, target: HartId) {
        if let Err(err) = self.clint.ipi_send(target.raw()) {
            log::warn!("ipi: send to hart {target} failed: {err}");
        }
    }

    fn ipi_clear(&self) {
        let hart = self.hart.hart_id();
        if let Err(err) = self.clint.ipi_clear(hart.raw()) {
            log::warn!("ipi: clear on hart {hart} failed: {err}");
        }
    }

    fn timer_init(&self, kind: BootKind) -> Result<(), PlatformError> {
        if kind.is_cold() {
            self.clint
                .cold_timer_init(self.config.clint_addr, self.config.hart_count, true)?;
        }
        self.clint.warm_timer_init(self.hart.hart_id().raw())?;
        Ok(())
    }

    fn timer_value(&self) -> u64 {
        self.clint.timer_value().unwrap_or(0)
    }

    fn timer_event_start(&self, deadline: u64) {
        let hart = self.hart.hart_id();
        if let Err(err) = self.clint.timer_event_start(hart.raw(), deadline) {
            log::warn!("timer: arm on hart {hart} failed: {err}");
        }
    }

    fn timer_event_stop(&self) {
        let hart = self.hart.hart_id();
        if let Err(err) = self.clint.timer_event_stop(hart.raw()) {
            log::warn!("timer: disarm on hart {hart} failed: {err}");
        }
    }

    fn system_reset(&self, kind: ResetKind, reason: u32) -> ! {
        if let Err(err) = self.reset.request_reset(kind, reason) {
            log::error!("reset: request failed: {err}");
        }
        // The finisher should have taken the machine down by now; there is
        // nowhere to return to either way.
        loop {
            #[cfg(target_arch = "riscv64")]
            // SAFETY: Waiting for an interrupt in a dead-end loop.
            unsafe {
                riscv::asm::wfi();
            }
            #[cfg(not(target_arch = "riscv64"))]
            core::hint::spin_loop();
        }
    }
}

impl<'b, B: MmioBus, H: HartContext> ConsoleSink for QemuVirtPlatform<'b, B, H> {
    fn write_byte(&self, byte: u8) {
        self.console_putc(byte);
    }
}

#[cfg(target_arch = "riscv64")]
mod machine {
    use conquer_once::spin::Lazy;
    use platform_mmio::PhysBus;

    use crate::boot::MachineHartContext;
    use crate::descriptor::PlatformDescriptor;
    use crate::logging;

    use super::{BoardConfig, QemuVirtPlatform};

    // SAFETY: BoardConfig::QEMU_VIRT routes every access to this machine's
    // device windows.
    static PHYS_BUS: PhysBus = unsafe { PhysBus::new() };

    static PLATFORM: Lazy<QemuVirtPlatform<'static, PhysBus, MachineHartContext>> = Lazy::new(|| {
        QemuVirtPlatform::new(&PHYS_BUS, BoardConfig::QEMU_VIRT, MachineHartContext::new())
    });

    /// The machine-backed platform instance.
    pub fn platform() -> &'static QemuVirtPlatform<'static, PhysBus, MachineHartContext> {
        &PLATFORM
    }

    /// Descriptor the firmware runtime discovers and calls through.
    pub fn descriptor() -> PlatformDescriptor<'static> {
        platform().descriptor()
    }

    /// Routes the `log` macros through the platform console. Call once on
    /// the cold hart after `console_init` has succeeded.
    pub fn init_logging() {
        logging::init(platform());
    }
}

#[cfg(target_arch = "riscv64")]
pub use machine::{descriptor, init_logging, platform};
