//! 8253/8254 PIT (Programmable Interval Timer) channel 0.
//!
//! Generates IRQ0 at a programmable frequency. Drives the system tick.

use super::cpu::PortIo;

const CH0_DATA: u16 = 0x40;
const CMD: u16 = 0x43;

/// PIT input clock in Hz
pub const PIT_BASE_HZ: u32 = 1_193_182;

/// Default tick rate (~10 ms per tick)
pub const TICK_HZ: u32 = 100;

/// Command: channel 0, lo/hi bytes, mode 3 (square wave), binary
const CMD_CH0_SQUARE: u8 = 0x36;

/// Reload value for `hz`, clamped to what the 16-bit counter can hold.
///
/// A reload of 0 means 65536 to the chip, which is the slowest rate.
pub fn divisor(hz: u32) -> u16 {
    match PIT_BASE_HZ.checked_div(hz) {
        Some(d) if d >= 0x1_0000 => 0,
        Some(0) => 1,
        Some(d) => d as u16,
        None => 0,
    }
}

/// Programs channel 0 to fire IRQ0 at roughly `hz`.
///
/// Call after the PIC remap, before enabling interrupts.
pub fn init<P: PortIo>(io: &P, hz: u32) {
    let divisor = divisor(hz);
    unsafe {
        io.write_u8(CMD, CMD_CH0_SQUARE);
        io.write_u8(CH0_DATA, (divisor & 0xFF) as u8);
        io.write_u8(CH0_DATA, (divisor >> 8) as u8);
    }
    log::debug!("pit: channel 0 at {} Hz (divisor {})", hz, divisor);
}
