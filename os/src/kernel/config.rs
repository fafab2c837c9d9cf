//! Boot-time configuration.

use log::LevelFilter;

use super::arch::x86::pic::{ChainedPics, MASTER_VECTOR, SLAVE_VECTOR};
use super::arch::x86::pit::TICK_HZ;
use super::error::{KernelError, KernelResult};
use super::idt::HARDWARE_VECTORS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// First vector of the master PIC.
    pub master_offset: u8,
    /// First vector of the slave PIC.
    pub slave_offset: u8,
    /// PIT channel 0 rate.
    pub tick_hz: u32,
    pub log_level: LevelFilter,
}

impl BootConfig {
    pub const DEFAULT: Self = Self {
        master_offset: MASTER_VECTOR,
        slave_offset: SLAVE_VECTOR,
        tick_hz: TICK_HZ,
        log_level: LevelFilter::Info,
    };

    /// Checks that both PIC ranges are 8-aligned, disjoint, and inside the
    /// vectors that have entry stubs (which also keeps them clear of the
    /// exception range).
    pub fn validate(&self) -> KernelResult<()> {
        let (master, slave) = (self.master_offset, self.slave_offset);
        let in_stub_range = |offset: u8| {
            offset % 8 == 0
                && offset >= HARDWARE_VECTORS.start
                && u16::from(offset) + 8 <= u16::from(HARDWARE_VECTORS.end)
        };

        if in_stub_range(master) && in_stub_range(slave) && master != slave {
            Ok(())
        } else {
            Err(KernelError::InvalidPicOffsets { master, slave })
        }
    }

    /// Vector `irq` raises under these offsets.
    pub fn irq_vector(&self, irq: u8) -> Option<u8> {
        ChainedPics::new(self.master_offset, self.slave_offset).vector_of(irq)
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
