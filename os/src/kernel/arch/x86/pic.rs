//! 8259 PIC (Programmable Interrupt Controller), master/slave cascade.
//!
//! Remaps IRQ 0–15 away from the CPU exception vectors (default 0x20–0x2F),
//! masks every line that has no handler, and sends end-of-interrupt after
//! each serviced hardware interrupt.

use bitflags::bitflags;

use super::cpu::PortIo;

const MASTER_CMD: u16 = 0x20;
const MASTER_DATA: u16 = 0x21;
const SLAVE_CMD: u16 = 0xA0;
const SLAVE_DATA: u16 = 0xA1;

const ICW1_ICW4: u8 = 0x01; // ICW4 will follow
const ICW1_INIT: u8 = 0x10;
const ICW4_8086: u8 = 0x01;
const MASTER_CASCADE: u8 = 0x04; // slave on IR2
const SLAVE_CASCADE: u8 = 0x02; // cascade identity 2
const EOI: u8 = 0x20;

/// Master line the slave is chained through.
pub const CASCADE_LINE: u8 = 2;

/// Default remap: master at 0x20–0x27, slave at 0x28–0x2F.
pub const MASTER_VECTOR: u8 = 0x20;
pub const SLAVE_VECTOR: u8 = 0x28;

/// IRQ numbers of the lines this kernel drives.
pub const IRQ_TIMER: u8 = 0;
pub const IRQ_KEYBOARD: u8 = 1;

bitflags! {
    /// The sixteen IRQ lines; bits 0–7 on the master, 8–15 on the slave.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptLines: u16 {
        const TIMER = 1 << 0;
        const KEYBOARD = 1 << 1;
        const CASCADE = 1 << 2;
        const COM2 = 1 << 3;
        const COM1 = 1 << 4;
        const LPT2 = 1 << 5;
        const FLOPPY = 1 << 6;
        const LPT1 = 1 << 7;
        const RTC = 1 << 8;
        const PERIPHERAL0 = 1 << 9;
        const PERIPHERAL1 = 1 << 10;
        const PERIPHERAL2 = 1 << 11;
        const PS2_MOUSE = 1 << 12;
        const FPU = 1 << 13;
        const PRIMARY_ATA = 1 << 14;
        const SECONDARY_ATA = 1 << 15;
    }
}

impl InterruptLines {
    /// Line for a single IRQ number; anything above 15 yields no line.
    pub fn irq(irq: u8) -> Self {
        Self::from_bits_truncate(1u16.checked_shl(u32::from(irq)).unwrap_or(0))
    }

    /// Master half.
    pub const fn low(self) -> u8 {
        self.bits() as u8
    }

    /// Slave half.
    pub const fn high(self) -> u8 {
        (self.bits() >> 8) as u8
    }
}

/// One 8259 chip.
#[derive(Debug, Clone, Copy)]
struct Pic {
    offset: u8,
    command: u16,
    data: u16,
    /// Mask as last written; a set bit disables the line.
    mask: u8,
}

impl Pic {
    /// Whether `vector` lands in this chip's programmed range.
    fn handles(&self, vector: u8) -> bool {
        vector.wrapping_sub(self.offset) < 8
    }

    fn end_of_interrupt<P: PortIo>(&self, io: &P) {
        unsafe { io.write_u8(self.command, EOI) }
    }

    fn write_mask<P: PortIo>(&mut self, io: &P, mask: u8) {
        unsafe { io.write_u8(self.data, mask) }
        self.mask = mask;
    }
}

/// The cascaded master/slave pair found on every PC.
#[derive(Debug, Clone)]
pub struct ChainedPics {
    master: Pic,
    slave: Pic,
}

impl ChainedPics {
    /// Describes both chips at the given offsets. Nothing is written until [`ChainedPics::remap`].
    pub const fn new(master_offset: u8, slave_offset: u8) -> Self {
        Self {
            master: Pic { offset: master_offset, command: MASTER_CMD, data: MASTER_DATA, mask: 0xFF },
            slave: Pic { offset: slave_offset, command: SLAVE_CMD, data: SLAVE_DATA, mask: 0xFF },
        }
    }

    /// Reprograms both chips so IRQ 0–7 raise `master_offset..+7` and IRQ 8–15
    /// raise `slave_offset..+7`, then leaves only `enabled` unmasked.
    ///
    /// The masks in effect before the sequence are saved and written back
    /// once the chips are programmed; the selective unmask follows.
    ///
    /// # Safety
    /// Must run with interrupts disabled, and the vector table must hold a
    /// gate for every vector that an enabled line can raise.
    pub unsafe fn remap<P: PortIo>(&mut self, io: &P, master_offset: u8, slave_offset: u8, enabled: InterruptLines) {
        let saved_master = io.read_u8(MASTER_DATA);
        let saved_slave = io.read_u8(SLAVE_DATA);

        self.master.offset = master_offset;
        self.slave.offset = slave_offset;

        // ICW1: start initialization, cascade mode, ICW4 present
        io.write_u8(MASTER_CMD, ICW1_INIT | ICW1_ICW4);
        io.io_wait();
        io.write_u8(SLAVE_CMD, ICW1_INIT | ICW1_ICW4);
        io.io_wait();

        // ICW2: vector offsets
        io.write_u8(MASTER_DATA, master_offset);
        io.io_wait();
        io.write_u8(SLAVE_DATA, slave_offset);
        io.io_wait();

        // ICW3: cascade wiring
        io.write_u8(MASTER_DATA, MASTER_CASCADE);
        io.io_wait();
        io.write_u8(SLAVE_DATA, SLAVE_CASCADE);
        io.io_wait();

        // ICW4: 8086 mode
        io.write_u8(MASTER_DATA, ICW4_8086);
        io.io_wait();
        io.write_u8(SLAVE_DATA, ICW4_8086);
        io.io_wait();

        self.master.write_mask(io, saved_master);
        self.slave.write_mask(io, saved_slave);

        self.set_enabled(io, enabled);

        log::debug!(
            "pic: remapped to {:#04x}/{:#04x}, masks {:#04x}/{:#04x}",
            master_offset,
            slave_offset,
            self.master.mask,
            self.slave.mask
        );
    }

    /// Unmasks exactly `enabled`; every other line is masked.
    ///
    /// The cascade line stays open whenever a slave line is enabled.
    pub fn set_enabled<P: PortIo>(&mut self, io: &P, enabled: InterruptLines) {
        let mut master = !enabled.low();
        if enabled.high() != 0 {
            master &= !(1 << CASCADE_LINE);
        }
        self.master.write_mask(io, master);
        self.slave.write_mask(io, !enabled.high());
    }

    /// Lines currently unmasked.
    pub fn enabled(&self) -> InterruptLines {
        InterruptLines::from_bits_truncate(u16::from_le_bytes([!self.master.mask, !self.slave.mask]))
    }

    /// Whether either chip raises `vector`.
    pub fn handles(&self, vector: u8) -> bool {
        self.master.handles(vector) || self.slave.handles(vector)
    }

    /// Vector raised by `irq` under the current offsets.
    pub fn vector_of(&self, irq: u8) -> Option<u8> {
        match irq {
            0..=7 => Some(self.master.offset.wrapping_add(irq)),
            8..=15 => Some(self.slave.offset.wrapping_add(irq - 8)),
            _ => None,
        }
    }

    /// Sends end-of-interrupt for `vector`.
    ///
    /// Slave vectors acknowledge the slave and then the master, since the
    /// slave is chained through the master's cascade line. Vectors neither
    /// chip raises are ignored without touching any port.
    pub fn acknowledge<P: PortIo>(&self, io: &P, vector: u8) {
        if self.slave.handles(vector) {
            self.slave.end_of_interrupt(io);
            self.master.end_of_interrupt(io);
        } else if self.master.handles(vector) {
            self.master.end_of_interrupt(io);
        }
    }

    pub fn offsets(&self) -> (u8, u8) {
        (self.master.offset, self.slave.offset)
    }

    /// Masks as last written, master first.
    pub fn masks(&self) -> (u8, u8) {
        (self.master.mask, self.slave.mask)
    }
}

impl Default for ChainedPics {
    fn default() -> Self {
        Self::new(MASTER_VECTOR, SLAVE_VECTOR)
    }
}
