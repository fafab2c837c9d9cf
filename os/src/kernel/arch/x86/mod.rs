//! 32-bit x86: privileged operations, 8259 PIC and 8253/8254 PIT.

pub mod cpu;
pub mod pic;
pub mod pit;

#[cfg(test)]
pub mod mock;


pub use cpu::{DescriptorTablePointer, PortIo, Privileged};

#[cfg(target_arch = "x86")]
pub use cpu::Hardware;
