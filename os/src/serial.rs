//! 16550 UART on COM1: the debug console, the `log` backend, and the sink
//! for fatal exception reports.

use core::fmt;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::kernel::arch::x86::{PortIo, Privileged};

pub const COM1: u16 = 0x3F8;

const DATA_OFF: u16 = 0;
const INTERRUPT_ENABLE_OFF: u16 = 1;
const FIFO_OFF: u16 = 2;
const LCR_OFF: u16 = 3;
const MCR_OFF: u16 = 4;
const LSR_OFF: u16 = 5;

const LCR_DLAB: u8 = 0x80;
const LCR_8N1: u8 = 0x03;
/// Enable FIFO, clear both queues, 14-byte threshold.
const FIFO_ENABLE_CLEAR_14: u8 = 0xC7;
const MCR_DTR_RTS: u8 = 0x03;
const LSR_THRE: u8 = 0x20;

/// 115200 / 3 = 38400 baud.
pub const BAUD_DIVISOR: u16 = 3;

/// A UART at `base`. Holds no state beyond the port address.
pub struct Serial<P> {
    io: P,
    base: u16,
}

impl<P: PortIo> Serial<P> {
    pub const fn new(io: P, base: u16) -> Self {
        Self { io, base }
    }

    /// Programs the baud divisor, 8N1, FIFOs and DTR/RTS. Interrupts stay off.
    pub fn init(&self) {
        let [divisor_lo, divisor_hi] = BAUD_DIVISOR.to_le_bytes();
        unsafe {
            self.io.write_u8(self.base + INTERRUPT_ENABLE_OFF, 0x00);
            self.io.write_u8(self.base + LCR_OFF, LCR_DLAB);
            self.io.write_u8(self.base + DATA_OFF, divisor_lo);
            self.io.write_u8(self.base + INTERRUPT_ENABLE_OFF, divisor_hi);
            self.io.write_u8(self.base + LCR_OFF, LCR_8N1);
            self.io.write_u8(self.base + FIFO_OFF, FIFO_ENABLE_CLEAR_14);
            self.io.write_u8(self.base + MCR_OFF, MCR_DTR_RTS);
        }
    }

    fn is_transmit_empty(&self) -> bool {
        unsafe { self.io.read_u8(self.base + LSR_OFF) & LSR_THRE != 0 }
    }

    /// Write one byte. Blocks until the transmit holding register is empty.
    pub fn write_byte(&self, byte: u8) {
        while !self.is_transmit_empty() {
            core::hint::spin_loop();
        }
        unsafe { self.io.write_u8(self.base + DATA_OFF, byte) }
    }
}

impl<P: PortIo> fmt::Write for Serial<P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

/// `log` backend writing `[LEVEL] target: message` lines to a UART.
///
/// Interrupt handlers log too, so the port is only ever held with maskable
/// interrupts disabled: a handler can never find it locked by the code it
/// interrupted.
pub struct SerialLogger<P> {
    cpu: P,
    serial: Mutex<Serial<P>>,
}

impl<P: PortIo> SerialLogger<P> {
    pub const fn new(cpu: P, serial: Serial<P>) -> Self {
        Self { cpu, serial: Mutex::new(serial) }
    }
}

impl<P: Privileged + Send + Sync> SerialLogger<P> {
    /// Initializes the UART and installs `self` as the global logger.
    pub fn install(&'static self, level: LevelFilter) -> Result<(), SetLoggerError> {
        self.cpu.without_interrupts(|| self.serial.lock().init());
        log::set_logger(self)?;
        log::set_max_level(level);
        Ok(())
    }
}

impl<P: Privileged + Send + Sync> Log for SerialLogger<P> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.cpu.without_interrupts(|| {
            let mut serial = self.serial.lock();
            let _ = fmt::Write::write_fmt(
                &mut *serial,
                format_args!("[{:<5}] {}: {}\n", record.level(), record.target(), record.args()),
            );
        });
    }

    fn flush(&self) {}
}
