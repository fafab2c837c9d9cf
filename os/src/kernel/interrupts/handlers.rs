//! Built-in hardware interrupt handlers: PIT tick (IRQ0) and PS/2 keyboard (IRQ1).

use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::kernel::arch::x86::PortIo;

// === Timer ===

/// Ticks between progress log lines.
pub const TICKS_PER_LOG: u64 = 100;

/// Counts PIT ticks.
pub struct Timer {
    ticks: AtomicU64,
}

impl Timer {
    pub const fn new() -> Self {
        Self { ticks: AtomicU64::new(0) }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn on_tick(&self) {
        let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if n % TICKS_PER_LOG == 0 {
            log::trace!("timer: {} ticks", n);
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl super::InterruptHandler for Timer {
    fn handle(&self, _vector: u8) {
        self.on_tick();
    }
}

// === Keyboard ===

const KEYBOARD_DATA: u16 = 0x60;

/// Set in a scancode (set 1) when the key was released.
pub const RELEASE_BIT: u8 = 0x80;

/// Reads scancodes from the PS/2 controller.
///
/// The scancode must be read on every IRQ1 or the controller will not
/// raise the next one.
pub struct Keyboard<P> {
    io: P,
    last: AtomicU8,
}

impl<P: PortIo> Keyboard<P> {
    pub const fn new(io: P) -> Self {
        Self { io, last: AtomicU8::new(0) }
    }

    /// Most recent scancode, 0 before the first key event.
    pub fn last_scancode(&self) -> u8 {
        self.last.load(Ordering::Relaxed)
    }
}

impl<P: PortIo + Sync> super::InterruptHandler for Keyboard<P> {
    fn handle(&self, _vector: u8) {
        let scancode = unsafe { self.io.read_u8(KEYBOARD_DATA) };
        self.last.store(scancode, Ordering::Relaxed);

        if scancode & RELEASE_BIT == 0 {
            log::debug!("keyboard: press {:#04x}", scancode);
        } else {
            log::trace!("keyboard: release {:#04x}", scancode & !RELEASE_BIT);
        }
    }
}
