//! Architecture support. Only 32-bit x86 protected mode is implemented.

pub mod x86;
