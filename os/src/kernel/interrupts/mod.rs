//! Interrupt dispatch
//!
//! Every entry stub lands in [`dispatch`] with a [`CpuSnapshot`]. Vectors
//! below 32 are CPU exceptions and are always fatal: a register dump goes to
//! the diagnostic sink and the processor halts. Everything else is looked up
//! in the [`HandlerRegistry`]; a registered handler runs and the PIC is then
//! acknowledged, an unregistered vector is dropped.

pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod report;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use dispatch::{classify, dispatch, Class, Dispatch};
pub use registry::HandlerRegistry;
pub use snapshot::{CpuSnapshot, Registers, StackFrame};

/// Something that services an interrupt vector.
///
/// Runs with maskable interrupts disabled and must not block.
pub trait InterruptHandler: Sync {
    fn handle(&self, vector: u8);
}

impl<F> InterruptHandler for F
where
    F: Fn(u8) + Sync,
{
    fn handle(&self, vector: u8) {
        self(vector)
    }
}

const EXCEPTION_NAMES: [&str; 32] = [
    "Divide Error",
    "Debug",
    "Non-Maskable Interrupt",
    "Breakpoint",
    "Overflow",
    "Bound Range Exceeded",
    "Invalid Opcode",
    "Device Not Available",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Invalid TSS",
    "Segment Not Present",
    "Stack-Segment Fault",
    "General Protection Fault",
    "Page Fault",
    "Reserved",
    "x87 Floating-Point Exception",
    "Alignment Check",
    "Machine Check",
    "SIMD Floating-Point Exception",
    "Virtualization Exception",
    "Control Protection Exception",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Hypervisor Injection Exception",
    "VMM Communication Exception",
    "Security Exception",
    "Reserved",
];

/// A CPU exception vector (0–31).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exception(u8);

impl Exception {
    pub const DIVIDE_ERROR: Self = Self(0);
    pub const DOUBLE_FAULT: Self = Self(8);
    pub const GENERAL_PROTECTION: Self = Self(13);
    pub const PAGE_FAULT: Self = Self(14);

    /// `None` for vectors outside the exception range.
    pub const fn new(vector: u8) -> Option<Self> {
        if (vector as usize) < EXCEPTION_NAMES.len() {
            Some(Self(vector))
        } else {
            None
        }
    }

    pub const fn vector(self) -> u8 {
        self.0
    }

    pub const fn name(self) -> &'static str {
        EXCEPTION_NAMES[self.0 as usize]
    }

    pub fn has_error_code(self) -> bool {
        snapshot::has_error_code(u32::from(self.0))
    }
}

impl core::fmt::Display for Exception {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{} {}", self.0, self.name())
    }
}
