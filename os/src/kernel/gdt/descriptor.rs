//! Segment descriptor encoding
//!
//! A protected-mode segment descriptor is 8 bytes with the base and limit
//! split across non-contiguous fields:
//!
//! ```text
//!  63    56 55  52 51  48 47      40 39        16 15         0
//! +--------+------+------+----------+------------+------------+
//! |base hi | flags|lim hi|  access  |  base lo   |  limit lo  |
//! | 31..24 |      |19..16|          |   23..0    |   15..0    |
//! +--------+------+------+----------+------------+------------+
//! ```

use bit_field::BitField;
use bitflags::bitflags;
use x86_64::PrivilegeLevel;

bitflags! {
    /// Access byte (bits 40..48).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessByte: u8 {
        /// Set by the CPU on first use.
        const ACCESSED = 1 << 0;
        /// Readable for code segments, writable for data segments.
        const READ_WRITE = 1 << 1;
        /// Conforming for code, grows-down for data.
        const DIRECTION_CONFORMING = 1 << 2;
        const EXECUTABLE = 1 << 3;
        /// Code/data segment (clear for system segments such as a TSS).
        const DESCRIPTOR_TYPE = 1 << 4;
        const DPL_LOW = 1 << 5;
        const DPL_HIGH = 1 << 6;
        const PRESENT = 1 << 7;

        /// 0x9A: present, ring 0, code, executable, readable.
        const KERNEL_CODE = Self::PRESENT.bits()
            | Self::DESCRIPTOR_TYPE.bits()
            | Self::EXECUTABLE.bits()
            | Self::READ_WRITE.bits();
        /// 0x92: present, ring 0, data, writable.
        const KERNEL_DATA = Self::PRESENT.bits()
            | Self::DESCRIPTOR_TYPE.bits()
            | Self::READ_WRITE.bits();
    }
}

impl AccessByte {
    const DPL_SHIFT: u8 = 5;

    /// Replaces the descriptor privilege level.
    pub fn with_privilege(self, level: PrivilegeLevel) -> Self {
        let cleared = self.bits() & !(Self::DPL_LOW.bits() | Self::DPL_HIGH.bits());
        Self::from_bits_retain(cleared | ((level as u8) << Self::DPL_SHIFT))
    }

    pub fn privilege(self) -> PrivilegeLevel {
        PrivilegeLevel::from_u16(u16::from((self.bits() >> Self::DPL_SHIFT) & 0b11))
    }
}

bitflags! {
    /// Flags nibble (bits 52..56).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u8 {
        /// Reserved / available to software.
        const AVAILABLE = 1 << 0;
        const LONG_MODE = 1 << 1;
        /// 32-bit default operand size.
        const DEFAULT_SIZE = 1 << 2;
        /// Limit counts 4 KiB pages instead of bytes.
        const GRANULARITY = 1 << 3;

        /// 32-bit segment with page-granular limit.
        const FLAT_32 = Self::DEFAULT_SIZE.bits() | Self::GRANULARITY.bits();
    }
}

/// An encoded 8-byte segment descriptor.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentDescriptor(u64);

impl SegmentDescriptor {
    /// Entry 0 of every GDT.
    pub const NULL: Self = Self(0);

    /// Largest 20-bit limit. With [`SegmentFlags::GRANULARITY`] it spans 4 GiB.
    pub const MAX_LIMIT: u32 = 0xF_FFFF;

    /// Packs the fields into hardware layout.
    ///
    /// `limit` is truncated to 20 bits; nothing else can be out of range.
    pub fn new(base: u32, limit: u32, access: AccessByte, flags: SegmentFlags) -> Self {
        let base = u64::from(base);
        let limit = u64::from(limit & Self::MAX_LIMIT);

        let mut value = 0u64;
        value.set_bits(0..16, limit & 0xFFFF);
        value.set_bits(16..40, base & 0xFF_FFFF);
        value.set_bits(40..48, u64::from(access.bits()));
        value.set_bits(48..52, limit >> 16);
        value.set_bits(52..56, u64::from(flags.bits() & 0x0F));
        value.set_bits(56..64, base >> 24);
        Self(value)
    }

    /// Ring 0 code segment covering the whole 4 GiB linear space.
    pub fn flat_code() -> Self {
        Self::new(0, Self::MAX_LIMIT, AccessByte::KERNEL_CODE, SegmentFlags::FLAT_32)
    }

    /// Ring 0 data segment covering the whole 4 GiB linear space.
    pub fn flat_data() -> Self {
        Self::new(0, Self::MAX_LIMIT, AccessByte::KERNEL_DATA, SegmentFlags::FLAT_32)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn base(self) -> u32 {
        let low = self.0.get_bits(16..40) as u32;
        let high = self.0.get_bits(56..64) as u32;
        (high << 24) | low
    }

    /// Raw 20-bit limit, in the unit selected by the granularity flag.
    pub fn limit(self) -> u32 {
        let low = self.0.get_bits(0..16) as u32;
        let high = self.0.get_bits(48..52) as u32;
        (high << 16) | low
    }

    pub fn access(self) -> AccessByte {
        AccessByte::from_bits_retain(self.0.get_bits(40..48) as u8)
    }

    pub fn flags(self) -> SegmentFlags {
        SegmentFlags::from_bits_truncate(self.0.get_bits(52..56) as u8)
    }

    /// Highest byte offset the segment allows.
    pub fn byte_limit(self) -> u64 {
        let limit = u64::from(self.limit());
        if self.flags().contains(SegmentFlags::GRANULARITY) {
            (limit << 12) | 0xFFF
        } else {
            limit
        }
    }

    pub fn is_present(self) -> bool {
        self.access().contains(AccessByte::PRESENT)
    }

    pub fn is_code(self) -> bool {
        self.access().contains(AccessByte::DESCRIPTOR_TYPE | AccessByte::EXECUTABLE)
    }
}

impl core::fmt::Debug for SegmentDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SegmentDescriptor")
            .field("base", &format_args!("{:#010x}", self.base()))
            .field("limit", &format_args!("{:#07x}", self.limit()))
            .field("access", &format_args!("{:#04x}", self.access().bits()))
            .field("flags", &format_args!("{:#x}", self.flags().bits()))
            .finish()
    }
}
