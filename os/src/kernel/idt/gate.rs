//! Gate descriptor encoding
//!
//! ```text
//!  63          48 47 46 45 44 43  40 39    32 31        16 15          0
//! +--------------+--+-----+--+------+--------+------------+-------------+
//! | offset 31..16| P| DPL | 0| type |   0    |  selector  | offset 15..0|
//! +--------------+--+-----+--+------+--------+------------+-------------+
//! ```

use bit_field::BitField;
use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

/// Gate type nibble (bits 40..44).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateType {
    Task = 0x5,
    Interrupt16 = 0x6,
    Trap16 = 0x7,
    /// Clears IF on entry; the only type this kernel installs.
    Interrupt32 = 0xE,
    Trap32 = 0xF,
}

impl GateType {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x0F {
            0x5 => Some(Self::Task),
            0x6 => Some(Self::Interrupt16),
            0x7 => Some(Self::Trap16),
            0xE => Some(Self::Interrupt32),
            0xF => Some(Self::Trap32),
            _ => None,
        }
    }

    /// Interrupt gates mask maskable interrupts for the duration of the handler.
    pub const fn clears_interrupt_flag(self) -> bool {
        matches!(self, Self::Interrupt16 | Self::Interrupt32)
    }
}

/// An encoded 8-byte IDT entry.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct GateDescriptor(u64);

impl GateDescriptor {
    /// Not present: firing this vector raises #NP, then #DF.
    pub const MISSING: Self = Self(0);

    /// Packs a present gate.
    pub fn new(handler: u32, selector: SegmentSelector, gate_type: GateType, dpl: PrivilegeLevel) -> Self {
        let handler = u64::from(handler);

        let mut value = 0u64;
        value.set_bits(0..16, handler & 0xFFFF);
        value.set_bits(16..32, u64::from(selector.0));
        value.set_bits(40..44, gate_type as u64);
        value.set_bits(45..47, dpl as u64 & 0b11);
        value.set_bit(47, true);
        value.set_bits(48..64, handler >> 16);
        Self(value)
    }

    /// Ring 0 32-bit interrupt gate, the form every populated slot takes.
    pub fn interrupt(handler: u32, selector: SegmentSelector) -> Self {
        Self::new(handler, selector, GateType::Interrupt32, PrivilegeLevel::Ring0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn handler(self) -> u32 {
        let low = self.0.get_bits(0..16) as u32;
        let high = self.0.get_bits(48..64) as u32;
        (high << 16) | low
    }

    pub fn selector(self) -> SegmentSelector {
        SegmentSelector(self.0.get_bits(16..32) as u16)
    }

    /// `None` for the reserved encodings.
    pub fn gate_type(self) -> Option<GateType> {
        GateType::from_bits(self.0.get_bits(40..44) as u8)
    }

    pub fn privilege(self) -> PrivilegeLevel {
        PrivilegeLevel::from_u16(self.0.get_bits(45..47) as u16)
    }

    pub fn is_present(self) -> bool {
        self.0.get_bit(47)
    }
}

impl core::fmt::Debug for GateDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if !self.is_present() {
            return f.write_str("GateDescriptor(missing)");
        }
        f.debug_struct("GateDescriptor")
            .field("handler", &format_args!("{:#010x}", self.handler()))
            .field("selector", &format_args!("{:#06x}", self.selector().0))
            .field("type", &self.gate_type())
            .field("dpl", &self.privilege())
            .finish()
    }
}
