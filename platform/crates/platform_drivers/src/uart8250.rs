//! 8250/16550-compatible console backend.
//!
//! Register offsets are scaled by a board-specific shift and accessed at a
//! board-specific width, so the same driver serves machines that map the
//! UART byte-wide, word-wide, or with spaced registers.

use conquer_once::spin::OnceCell;
use platform_mmio::MmioBus;

use crate::DriverError;

const RBR_OFFSET: u64 = 0; // receive buffer (read)
const THR_OFFSET: u64 = 0; // transmit holding (write)
const DLL_OFFSET: u64 = 0; // divisor latch low (DLAB=1)
const IER_OFFSET: u64 = 1; // interrupt enable
const DLM_OFFSET: u64 = 1; // divisor latch high (DLAB=1)
const FCR_OFFSET: u64 = 2; // FIFO control
const LCR_OFFSET: u64 = 3; // line control
const MCR_OFFSET: u64 = 4; // modem control
const LSR_OFFSET: u64 = 5; // line status
const SCR_OFFSET: u64 = 7; // scratch

const LSR_DATA_READY: u32 = 0x01;
const LSR_THR_EMPTY: u32 = 0x20;

const LCR_DLAB: u32 = 0x80;
const LCR_8N1: u32 = 0x03;
const FCR_FIFO_ENABLE: u32 = 0x01;

#[derive(Debug)]
struct UartState {
    base: u64,
    reg_shift: u32,
    reg_width: u32,
}

/// Console backend over an MMIO bus.
pub struct Uart8250<'b, B: MmioBus> {
    bus: &'b B,
    state: OnceCell<UartState>,
}

impl<'b, B: MmioBus> Uart8250<'b, B> {
    #[must_use]
    pub const fn new(bus: &'b B) -> Self {
        Self {
            bus,
            state: OnceCell::uninit(),
        }
    }

    /// One-time console setup, cold boot only.
    ///
    /// `input_clock` is the UART reference clock in Hz; together with
    /// `baudrate` it determines the divisor latch value. Passing 0 for
    /// either skips divisor programming (pre-configured hardware).
    pub fn init(
        &self,
        base: u64,
        input_clock: u32,
        baudrate: u32,
        reg_shift: u32,
        reg_width: u32,
    ) -> Result<(), DriverError> {
        if !matches!(reg_width, 1 | 2 | 4) {
            return Err(DriverError::UnsupportedRegisterWidth(reg_width));
        }

        self.state
            .try_init_once(|| UartState {
                base,
                reg_shift,
                reg_width,
            })
            .map_err(|_| DriverError::AlreadyInitialized)?;
        let state = self.state.get().ok_or(DriverError::NotReady)?;

        let divisor = if baudrate > 0 { input_clock / (16 * baudrate) } else { 0 };

        // Interrupts off while reprogramming.
        self.write_reg(state, IER_OFFSET, 0x00);
        if divisor > 0 {
            self.write_reg(state, LCR_OFFSET, LCR_DLAB);
            self.write_reg(state, DLL_OFFSET, divisor & 0xff);
            self.write_reg(state, DLM_OFFSET, (divisor >> 8) & 0xff);
        }
        // 8 data bits, no parity, one stop bit.
        self.write_reg(state, LCR_OFFSET, LCR_8N1);
        self.write_reg(state, FCR_OFFSET, FCR_FIFO_ENABLE);
        self.write_reg(state, MCR_OFFSET, 0x00);
        // Drain stale line status and receive data.
        self.read_reg(state, LSR_OFFSET);
        self.read_reg(state, RBR_OFFSET);
        self.write_reg(state, SCR_OFFSET, 0x00);

        log::info!("uart8250: init at {base:#x}, {baudrate} baud");
        Ok(())
    }

    /// Transmits one byte, busy-waiting until the holding register is free.
    /// Safe for concurrent callers; byte interleaving across harts is
    /// unspecified.
    pub fn putc(&self, byte: u8) -> Result<(), DriverError> {
        let state = self.state.get().ok_or(DriverError::NotReady)?;
        while self.read_reg(state, LSR_OFFSET) & LSR_THR_EMPTY == 0 {
            core::hint::spin_loop();
        }
        self.write_reg(state, THR_OFFSET, u32::from(byte));
        Ok(())
    }

    /// Non-blocking receive; `None` means no byte pending.
    pub fn getc(&self) -> Result<Option<u8>, DriverError> {
        let state = self.state.get().ok_or(DriverError::NotReady)?;
        if self.read_reg(state, LSR_OFFSET) & LSR_DATA_READY == 0 {
            return Ok(None);
        }
        Ok(Some(self.read_reg(state, RBR_OFFSET) as u8))
    }

    fn reg_addr(state: &UartState, offset: u64) -> u64 {
        state.base + (offset << state.reg_shift)
    }

    fn read_reg(&self, state: &UartState, offset: u64) -> u32 {
        let addr = Self::reg_addr(state, offset);
        match state.reg_width {
            1 => u32::from(self.bus.read8(addr)),
            2 => u32::from(self.bus.read16(addr)),
            _ => self.bus.read32(addr),
        }
    }

    fn write_reg(&self, state: &UartState, offset: u64, value: u32) {
        let addr = Self::reg_addr(state, offset);
        match state.reg_width {
            1 => self.bus.write8(addr, value as u8),
            2 => self.bus.write16(addr, value as u16),
            _ => self.bus.write32(addr, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use platform_mmio::fake::FakeBus;

    use super::*;

    const BASE: u64 = 0x1000_0000;
    const CLOCK: u32 = 1_843_200;
    const BAUD: u32 = 115_200;

    fn ready_uart(bus: &FakeBus) -> Uart8250<'_, FakeBus> {
        // Line status: transmitter idle, no receive data.
        bus.preload(BASE + LSR_OFFSET, u64::from(LSR_THR_EMPTY));
        let uart = Uart8250::new(bus);
        uart.init(BASE, CLOCK, BAUD, 0, 1).unwrap();
        uart
    }

    #[test]
    fn init_programs_divisor_and_line_format() {
        let bus = FakeBus::new();
        let uart = Uart8250::new(&bus);
        uart.init(BASE, CLOCK, BAUD, 0, 1).unwrap();

        // 1.8432 MHz / (16 * 115200) = 1
        assert_eq!(
            &[
                (BASE + IER_OFFSET, 0x00),
                (BASE + LCR_OFFSET, 0x80),
                (BASE + DLL_OFFSET, 0x01),
                (BASE + DLM_OFFSET, 0x00),
                (BASE + LCR_OFFSET, 0x03),
                (BASE + FCR_OFFSET, 0x01),
                (BASE + MCR_OFFSET, 0x00),
                (BASE + SCR_OFFSET, 0x00),
            ],
            &bus.writes()[..]
        );
    }

    #[test]
    fn init_skips_divisor_when_baud_is_zero() {
        let bus = FakeBus::new();
        let uart = Uart8250::new(&bus);
        uart.init(BASE, CLOCK, 0, 0, 1).unwrap();
        // No DLAB pass: first two writes are IER then 8N1 line format.
        assert_eq!((BASE + IER_OFFSET, 0x00), bus.writes()[0]);
        assert_eq!((BASE + LCR_OFFSET, 0x03), bus.writes()[1]);
    }

    #[test]
    fn init_rejects_unsupported_register_width() {
        let bus = FakeBus::new();
        let uart = Uart8250::new(&bus);
        assert_eq!(
            Err(DriverError::UnsupportedRegisterWidth(3)),
            uart.init(BASE, CLOCK, BAUD, 0, 3)
        );
    }

    #[test]
    fn init_twice_fails() {
        let bus = FakeBus::new();
        let uart = ready_uart(&bus);
        assert_eq!(Err(DriverError::AlreadyInitialized), uart.init(BASE, CLOCK, BAUD, 0, 1));
    }

    #[test]
    fn putc_waits_for_transmitter_then_writes() {
        let bus = FakeBus::new();
        let uart = ready_uart(&bus);
        uart.putc(b'x').unwrap();
        assert_eq!(Some(u64::from(b'x')), bus.value(BASE + THR_OFFSET));
    }

    #[test]
    fn getc_is_non_blocking() {
        let bus = FakeBus::new();
        let uart = ready_uart(&bus);
        assert_eq!(Ok(None), uart.getc());

        bus.preload(BASE + LSR_OFFSET, u64::from(LSR_THR_EMPTY | LSR_DATA_READY));
        bus.preload(BASE + RBR_OFFSET, u64::from(b'y'));
        assert_eq!(Ok(Some(b'y')), uart.getc());
    }

    #[test]
    fn register_shift_spaces_the_registers() {
        let bus = FakeBus::new();
        let uart = Uart8250::new(&bus);
        uart.init(BASE, CLOCK, 0, 2, 4).unwrap();
        // With shift 2 the line control register sits at offset 3 << 2.
        assert_eq!(Some(0x03), bus.value(BASE + (LCR_OFFSET << 2)));
    }

    #[test]
    fn io_before_init_fails() {
        let bus = FakeBus::new();
        let uart = Uart8250::new(&bus);
        assert_eq!(Err(DriverError::NotReady), uart.putc(b'a'));
        assert_eq!(Err(DriverError::NotReady), uart.getc());
    }
}
