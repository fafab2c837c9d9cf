//! Vector → handler table.

use spin::Mutex;

use crate::kernel::arch::x86::pic::InterruptLines;

use super::InterruptHandler;

type Slot = Option<&'static dyn InterruptHandler>;

/// Handlers for vectors 0–255. Every slot starts empty.
pub struct HandlerRegistry {
    slots: Mutex<[Slot; 256]>,
}

impl HandlerRegistry {
    pub const fn new() -> Self {
        Self { slots: Mutex::new([None; 256]) }
    }

    /// Installs `handler` for `vector`, returning whatever it replaced.
    pub fn register(&self, vector: u8, handler: &'static dyn InterruptHandler) -> Slot {
        self.slots.lock()[usize::from(vector)].replace(handler)
    }

    pub fn unregister(&self, vector: u8) -> Slot {
        self.slots.lock()[usize::from(vector)].take()
    }

    /// The handler for `vector`. The lock is released before this returns,
    /// so the handler may itself register or unregister.
    pub fn get(&self, vector: u8) -> Slot {
        self.slots.lock()[usize::from(vector)]
    }

    pub fn is_registered(&self, vector: u8) -> bool {
        self.get(vector).is_some()
    }

    /// PIC lines whose vector (under the given offsets) has a handler.
    pub fn lines(&self, master_offset: u8, slave_offset: u8) -> InterruptLines {
        let slots = self.slots.lock();
        (0..16u8)
            .filter(|&irq| {
                let vector = match irq {
                    0..=7 => master_offset.wrapping_add(irq),
                    _ => slave_offset.wrapping_add(irq - 8),
                };
                slots[usize::from(vector)].is_some()
            })
            .fold(InterruptLines::empty(), |lines, irq| lines | InterruptLines::irq(irq))
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
