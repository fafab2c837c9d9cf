//! Interrupt Descriptor Table (IDT)
//!
//! 256 gates. Vectors 0–31 are CPU exceptions, 32–47 are the sixteen PIC
//! lines after remap. Both ranges get ring 0 32-bit interrupt gates pointing
//! at their entry stub. Vectors 48–255 stay absent: firing one faults.

pub mod gate;
pub mod stubs;


pub use gate::{GateDescriptor, GateType};
pub use stubs::{EntryPoints, STUB_COUNT};

use core::mem::size_of;
use core::ops::Range;

use x86_64::structures::gdt::SegmentSelector;

use crate::kernel::arch::x86::{DescriptorTablePointer, Privileged};

pub const VECTOR_COUNT: usize = 256;

/// CPU-reserved exception vectors.
pub const EXCEPTION_VECTORS: Range<u8> = 0..32;

/// Vectors of the sixteen PIC lines after remap.
pub const HARDWARE_VECTORS: Range<u8> = 32..48;

#[repr(C, align(8))]
#[derive(Clone)]
pub struct VectorTable {
    gates: [GateDescriptor; VECTOR_COUNT],
}

impl VectorTable {
    /// Every gate absent.
    pub const fn new() -> Self {
        Self { gates: [GateDescriptor::MISSING; VECTOR_COUNT] }
    }

    /// Installs an interrupt gate to each entry stub, through `selector`.
    pub fn populate(&mut self, entry_points: &EntryPoints, selector: SegmentSelector) {
        for (vector, &handler) in entry_points.iter().enumerate() {
            self.gates[vector] = GateDescriptor::interrupt(handler, selector);
        }
    }

    pub fn gate(&self, vector: u8) -> GateDescriptor {
        self.gates[usize::from(vector)]
    }

    pub fn gates(&self) -> &[GateDescriptor; VECTOR_COUNT] {
        &self.gates
    }

    /// Number of present gates.
    pub fn present(&self) -> usize {
        self.gates.iter().filter(|gate| gate.is_present()).count()
    }

    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer::for_table(
            self.gates.as_ptr() as usize as u32,
            VECTOR_COUNT,
            size_of::<GateDescriptor>(),
        )
    }
}

impl Default for VectorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for VectorTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VectorTable").field("present", &self.present()).finish()
    }
}

/// Clears `table`, installs the exception and PIC gates, and loads it into IDTR.
///
/// # Safety
/// The GDT holding `code_selector` must already be loaded, and `table` must
/// stay at its address for as long as it is loaded.
pub unsafe fn init<C: Privileged>(
    cpu: &C,
    table: &mut VectorTable,
    entry_points: &EntryPoints,
    code_selector: SegmentSelector,
) {
    *table = VectorTable::new();
    table.populate(entry_points, code_selector);

    let pointer = table.pointer();
    cpu.load_idt(&pointer);

    log::debug!("idt: loaded {:?}, {} gates present", pointer, table.present());
}
