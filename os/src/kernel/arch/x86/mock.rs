//! Recording stand-in for [`Privileged`] used by host tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::vec::Vec;

use x86_64::structures::gdt::SegmentSelector;

use super::cpu::{DescriptorTablePointer, PortIo, Privileged, IO_WAIT_PORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    In(u16),
    Out(u16, u8),
    LoadGdt { base: u32, limit: u16 },
    ReloadSegments { code: u16, data: u16 },
    LoadIdt { base: u32, limit: u16 },
    EnableInterrupts,
    DisableInterrupts,
    WaitForInterrupt,
    Halt,
}

/// Message carried by the panic that stands in for a halted processor.
pub const HALTED: &str = "cpu halted";

#[derive(Default)]
pub struct MockCpu {
    ops: Mutex<Vec<Op>>,
    ports: Mutex<HashMap<u16, u8>>,
    interrupts: Mutex<bool>,
}

impl MockCpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value returned by subsequent reads of `port`. Unset ports read as 0xFF.
    pub fn set_port(&self, port: u16, value: u8) {
        self.ports.lock().unwrap().insert(port, value);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    /// Recorded writes, without the I/O delay writes.
    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Out(port, value) if port != IO_WAIT_PORT => Some((port, value)),
                _ => None,
            })
            .collect()
    }

    /// Recorded writes to one port.
    pub fn writes_to(&self, port: u16) -> Vec<u8> {
        self.writes()
            .into_iter()
            .filter(|(p, _)| *p == port)
            .map(|(_, value)| value)
            .collect()
    }

    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    pub fn halted(&self) -> bool {
        self.ops().contains(&Op::Halt)
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }
}

impl PortIo for MockCpu {
    unsafe fn read_u8(&self, port: u16) -> u8 {
        self.record(Op::In(port));
        self.ports.lock().unwrap().get(&port).copied().unwrap_or(0xFF)
    }

    unsafe fn write_u8(&self, port: u16, value: u8) {
        self.record(Op::Out(port, value));
    }
}

impl Privileged for MockCpu {
    unsafe fn load_gdt(&self, pointer: &DescriptorTablePointer) {
        self.record(Op::LoadGdt { base: pointer.base(), limit: pointer.limit() });
    }

    unsafe fn reload_segments(&self, code: SegmentSelector, data: SegmentSelector) {
        self.record(Op::ReloadSegments { code: code.0, data: data.0 });
    }

    unsafe fn load_idt(&self, pointer: &DescriptorTablePointer) {
        self.record(Op::LoadIdt { base: pointer.base(), limit: pointer.limit() });
    }

    fn enable_interrupts(&self) {
        *self.interrupts.lock().unwrap() = true;
        self.record(Op::EnableInterrupts);
    }

    fn disable_interrupts(&self) {
        *self.interrupts.lock().unwrap() = false;
        self.record(Op::DisableInterrupts);
    }

    fn interrupts_enabled(&self) -> bool {
        *self.interrupts.lock().unwrap()
    }

    fn wait_for_interrupt(&self) {
        self.record(Op::WaitForInterrupt);
    }

    fn halt(&self) -> ! {
        self.record(Op::Halt);
        panic!("{}", HALTED);
    }
}
