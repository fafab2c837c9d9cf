//! Global Descriptor Table (GDT)
//!
//! The kernel runs in the flat model: one code and one data segment, both
//! based at 0 and spanning the full 4 GiB, so segmentation never faults on
//! an address the kernel produces. The table has exactly three entries:
//!
//! | index | selector | segment          |
//! |-------|----------|------------------|
//! | 0     | 0x00     | null             |
//! | 1     | 0x08     | ring 0 code      |
//! | 2     | 0x10     | ring 0 data      |

pub mod descriptor;


pub use descriptor::{AccessByte, SegmentDescriptor, SegmentFlags};

use core::mem::size_of;

use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

use crate::kernel::arch::x86::{DescriptorTablePointer, Privileged};

pub const GDT_ENTRY_COUNT: usize = 3;

pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(1, PrivilegeLevel::Ring0);
pub const KERNEL_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(2, PrivilegeLevel::Ring0);

/// Selectors the CPU runs with once the table is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selectors {
    pub code_selector: SegmentSelector,
    pub data_selector: SegmentSelector,
}

/// The segment table as the CPU reads it.
#[repr(C, align(8))]
#[derive(Debug, Clone)]
pub struct SegmentTable {
    entries: [SegmentDescriptor; GDT_ENTRY_COUNT],
}

impl SegmentTable {
    /// All entries null.
    pub const fn empty() -> Self {
        Self { entries: [SegmentDescriptor::NULL; GDT_ENTRY_COUNT] }
    }

    /// Null, flat code, flat data.
    pub fn flat() -> Self {
        Self {
            entries: [
                SegmentDescriptor::NULL,
                SegmentDescriptor::flat_code(),
                SegmentDescriptor::flat_data(),
            ],
        }
    }

    pub fn entries(&self) -> &[SegmentDescriptor; GDT_ENTRY_COUNT] {
        &self.entries
    }

    /// Descriptor a selector refers to; `None` past the end of the table.
    pub fn get(&self, selector: SegmentSelector) -> Option<SegmentDescriptor> {
        self.entries.get(usize::from(selector.index())).copied()
    }

    /// Whether `selector` names a present code segment, i.e. is usable in a gate.
    pub fn is_code_selector(&self, selector: SegmentSelector) -> bool {
        selector.index() != 0 && self.get(selector).is_some_and(|d| d.is_present() && d.is_code())
    }

    pub fn selectors(&self) -> Selectors {
        Selectors { code_selector: KERNEL_CODE_SELECTOR, data_selector: KERNEL_DATA_SELECTOR }
    }

    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer::for_table(
            self.entries.as_ptr() as usize as u32,
            GDT_ENTRY_COUNT,
            size_of::<SegmentDescriptor>(),
        )
    }
}

impl Default for SegmentTable {
    fn default() -> Self {
        Self::flat()
    }
}

/// Builds the flat table in place, loads it into GDTR and reloads CS, DS, ES, FS, GS and SS.
///
/// Running it again rebuilds the same table and reloads the same selectors.
///
/// # Safety
/// `table` must stay at its address for as long as it is loaded.
pub unsafe fn init<C: Privileged>(cpu: &C, table: &mut SegmentTable) -> Selectors {
    *table = SegmentTable::flat();
    let selectors = table.selectors();

    let pointer = table.pointer();
    cpu.load_gdt(&pointer);
    cpu.reload_segments(selectors.code_selector, selectors.data_selector);

    log::debug!(
        "gdt: loaded {:?}, code {:#06x}, data {:#06x}",
        pointer,
        selectors.code_selector.0,
        selectors.data_selector.0
    );
    selectors
}
