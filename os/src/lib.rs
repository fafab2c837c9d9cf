//! Saturn kernel core.
//!
//! Brings a 32-bit x86 machine from the bootloader's hand-off to a state
//! where hardware interrupts are routed to Rust handlers: flat GDT, IDT with
//! entry stubs for vectors 0–47, remapped 8259 pair, PIT tick. Exceptions
//! dump the register state to COM1 and halt.

#![cfg_attr(not(test), no_std)]

pub mod kernel;
pub mod serial;
