//! Dispatch tests

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::string::String;
use std::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use super::handlers::{Keyboard, Timer};
use super::report::{write_exception_report, BANNER};
use super::*;
use crate::kernel::arch::x86::mock::{MockCpu, Op};
use crate::kernel::arch::x86::pic::ChainedPics;
use crate::kernel::error::KernelError;

fn snapshot(vector: u32) -> CpuSnapshot {
    CpuSnapshot { vector, ..CpuSnapshot::default() }
}

#[test]
fn vectors_split_at_32() {
    assert_eq!(classify(0), Class::Exception(Exception::DIVIDE_ERROR));
    assert_eq!(classify(14), Class::Exception(Exception::PAGE_FAULT));
    assert_eq!(classify(31), Class::Exception(Exception::new(31).unwrap()));
    assert_eq!(classify(32), Class::Interrupt(32));
    assert_eq!(classify(0x80), Class::Interrupt(0x80));
    assert_eq!(classify(255), Class::Interrupt(255));
}

#[test]
fn exception_names() {
    assert_eq!(Exception::DIVIDE_ERROR.name(), "Divide Error");
    assert_eq!(Exception::PAGE_FAULT.name(), "Page Fault");
    assert_eq!(Exception::GENERAL_PROTECTION.name(), "General Protection Fault");
    assert_eq!(std::format!("{}", Exception::DOUBLE_FAULT), "#8 Double Fault");
    assert!(Exception::new(32).is_none());
}

#[test]
fn error_code_only_for_vectors_that_push_one() {
    let with: Vec<u8> = (0..32).filter(|&v| Exception::new(v).unwrap().has_error_code()).collect();
    assert_eq!(with, [8, 10, 11, 12, 13, 14, 17]);

    let mut captured = snapshot(14);
    captured.frame.error_code = 0x2;
    assert_eq!(captured.error_code(), 0x2);

    // A stub without a CPU error code pushed 0, but whatever is there is ignored.
    captured.vector = 3;
    captured.frame.error_code = 0xDEAD;
    assert_eq!(captured.error_code(), 0);
}

#[test]
fn registered_handler_runs_once_then_eoi() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static LAST: AtomicUsize = AtomicUsize::new(0);
    static HANDLER: fn(u8) = |vector| {
        CALLS.fetch_add(1, Ordering::SeqCst);
        LAST.store(usize::from(vector), Ordering::SeqCst);
    };

    let cpu = MockCpu::new();
    let registry = HandlerRegistry::new();
    let pics = Mutex::new(ChainedPics::default());
    registry.register(0x21, &HANDLER);

    let mut sink = String::new();
    let outcome = dispatch(&cpu, &registry, &pics, &mut sink, &snapshot(0x21));

    assert_eq!(outcome, Ok(Dispatch::Handled));
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(LAST.load(Ordering::SeqCst), 0x21);
    assert_eq!(cpu.writes(), [(0x20, 0x20)]);
    assert!(sink.is_empty());
}

#[test]
fn slave_interrupt_acknowledges_both_chips() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static HANDLER: fn(u8) = |_| {
        CALLS.fetch_add(1, Ordering::SeqCst);
    };

    let cpu = MockCpu::new();
    let registry = HandlerRegistry::new();
    let pics = Mutex::new(ChainedPics::default());
    registry.register(0x2C, &HANDLER);

    let outcome = dispatch(&cpu, &registry, &pics, &mut String::new(), &snapshot(0x2C));

    assert_eq!(outcome, Ok(Dispatch::Handled));
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(cpu.writes(), [(0xA0, 0x20), (0x20, 0x20)]);
}

#[test]
fn handler_runs_before_acknowledge() {
    use crate::kernel::arch::x86::PortIo;

    struct PortWriter(&'static MockCpu);

    impl InterruptHandler for PortWriter {
        fn handle(&self, _vector: u8) {
            unsafe { self.0.write_u8(0x3F8, b'!') };
        }
    }

    let cpu: &'static MockCpu = Box::leak(Box::new(MockCpu::new()));
    let writer: &'static PortWriter = Box::leak(Box::new(PortWriter(cpu)));
    let registry = HandlerRegistry::new();
    let pics = Mutex::new(ChainedPics::default());
    registry.register(0x20, writer);

    dispatch(cpu, &registry, &pics, &mut String::new(), &snapshot(0x20)).unwrap();

    assert_eq!(cpu.writes(), [(0x3F8, b'!'), (0x20, 0x20)]);
}

#[test]
fn unregistered_interrupt_is_dropped() {
    let cpu = MockCpu::new();
    let registry = HandlerRegistry::new();
    let pics = Mutex::new(ChainedPics::default());

    for vector in [0x20, 0x2F, 0x30, 0x80, 0xFF] {
        let outcome = dispatch(&cpu, &registry, &pics, &mut String::new(), &snapshot(vector));
        assert_eq!(outcome, Ok(Dispatch::Unhandled));
    }
    assert!(cpu.ops().is_empty());
}

#[test]
fn software_vector_handler_sends_no_eoi() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static HANDLER: fn(u8) = |_| {
        CALLS.fetch_add(1, Ordering::SeqCst);
    };

    let cpu = MockCpu::new();
    let registry = HandlerRegistry::new();
    let pics = Mutex::new(ChainedPics::default());
    registry.register(0x80, &HANDLER);

    let outcome = dispatch(&cpu, &registry, &pics, &mut String::new(), &snapshot(0x80));

    assert_eq!(outcome, Ok(Dispatch::Handled));
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert!(cpu.ops().is_empty());
}

#[test]
fn second_registration_replaces_the_first() {
    static FIRST: AtomicUsize = AtomicUsize::new(0);
    static SECOND: AtomicUsize = AtomicUsize::new(0);
    static HANDLER_A: fn(u8) = |_| {
        FIRST.fetch_add(1, Ordering::SeqCst);
    };
    static HANDLER_B: fn(u8) = |_| {
        SECOND.fetch_add(1, Ordering::SeqCst);
    };

    let cpu = MockCpu::new();
    let registry = HandlerRegistry::new();
    let pics = Mutex::new(ChainedPics::default());

    assert!(registry.register(0x21, &HANDLER_A).is_none());
    assert!(registry.register(0x21, &HANDLER_B).is_some());

    dispatch(&cpu, &registry, &pics, &mut String::new(), &snapshot(0x21)).unwrap();

    assert_eq!(FIRST.load(Ordering::SeqCst), 0);
    assert_eq!(SECOND.load(Ordering::SeqCst), 1);
}

#[test]
fn unregister_empties_the_slot() {
    static HANDLER: fn(u8) = |_| {};

    let registry = HandlerRegistry::new();
    registry.register(0x28, &HANDLER);
    assert!(registry.is_registered(0x28));

    assert!(registry.unregister(0x28).is_some());
    assert!(!registry.is_registered(0x28));
    assert!(registry.unregister(0x28).is_none());
}

#[test]
fn registry_reports_lines_with_handlers() {
    use crate::kernel::arch::x86::pic::InterruptLines;

    static HANDLER: fn(u8) = |_| {};

    let registry = HandlerRegistry::new();
    assert!(registry.lines(0x20, 0x28).is_empty());

    registry.register(0x20, &HANDLER);
    registry.register(0x21, &HANDLER);
    registry.register(0x2E, &HANDLER);
    // not a PIC vector
    registry.register(0x80, &HANDLER);

    assert_eq!(
        registry.lines(0x20, 0x28),
        InterruptLines::TIMER | InterruptLines::KEYBOARD | InterruptLines::PRIMARY_ATA
    );
}

#[test]
fn page_fault_reports_and_halts() {
    let cpu = MockCpu::new();
    let registry = HandlerRegistry::new();
    let pics = Mutex::new(ChainedPics::default());
    let mut sink = String::new();

    let captured = CpuSnapshot {
        registers: Registers {
            eax: 0x1111_1111,
            ebx: 0x2222_2222,
            ecx: 0x3333_3333,
            edx: 0x4444_4444,
            esp: 0x0010_7FC0,
            ebp: 0x0010_7FF0,
            esi: 0x5555_5555,
            edi: 0x6666_6666,
        },
        vector: 14,
        frame: StackFrame { error_code: 0x2, eip: 0x0010_1A2C, cs: 0x08, eflags: 0x0001_0006 },
    };

    let result = catch_unwind(AssertUnwindSafe(|| {
        let _ = dispatch(&cpu, &registry, &pics, &mut sink, &captured);
    }));

    assert!(result.is_err());
    assert!(cpu.halted());
    assert!(cpu.writes().is_empty());

    let lines: Vec<&str> = sink.lines().collect();
    assert_eq!(
        lines,
        [
            BANNER,
            "Interrupt No: 14",
            "Exception: Page Fault",
            "Error Code: 0x00000002",
            "EIP: 0x00101a2c",
            "CS: 0x0008",
            "EFLAGS: 0x00010006",
            "EAX: 0x11111111",
            "EBX: 0x22222222",
            "ECX: 0x33333333",
            "EDX: 0x44444444",
            "ESP: 0x00107fc0",
            "EBP: 0x00107ff0",
            "ESI: 0x55555555",
            "EDI: 0x66666666",
        ]
    );
}

#[test]
fn exception_halts_even_with_a_handler() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static HANDLER: fn(u8) = |_| {
        CALLS.fetch_add(1, Ordering::SeqCst);
    };

    let cpu = MockCpu::new();
    let registry = HandlerRegistry::new();
    let pics = Mutex::new(ChainedPics::default());
    registry.register(3, &HANDLER);

    let result = catch_unwind(AssertUnwindSafe(|| {
        let _ = dispatch(&cpu, &registry, &pics, &mut String::new(), &snapshot(3));
    }));

    assert!(result.is_err());
    assert!(cpu.halted());
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);
}

#[test]
fn report_omits_error_code_when_none_was_pushed() {
    let mut captured = snapshot(0);
    captured.frame.error_code = 0xDEAD;

    let mut sink = String::new();
    write_exception_report(&mut sink, &captured).unwrap();

    assert!(sink.contains("Interrupt No: 0\n"));
    assert!(sink.contains("Exception: Divide Error\n"));
    assert!(!sink.contains("Error Code"));
}

#[test]
fn out_of_range_vector_is_rejected() {
    let cpu = MockCpu::new();
    let registry = HandlerRegistry::new();
    let pics = Mutex::new(ChainedPics::default());
    let mut sink = String::new();

    let outcome = dispatch(&cpu, &registry, &pics, &mut sink, &snapshot(300));

    assert_eq!(outcome, Err(KernelError::InvalidVector(300)));
    assert!(cpu.ops().is_empty());
    assert!(sink.is_empty());
}

#[test]
fn timer_counts_ticks() {
    let timer = Timer::new();
    for _ in 0..250 {
        timer.handle(0x20);
    }
    assert_eq!(timer.ticks(), 250);
}

#[test]
fn keyboard_reads_the_scancode() {
    let cpu = MockCpu::new();
    cpu.set_port(0x60, 0x1E);
    let keyboard = Keyboard::new(&cpu);

    assert_eq!(keyboard.last_scancode(), 0);
    keyboard.handle(0x21);

    assert_eq!(keyboard.last_scancode(), 0x1E);
    assert_eq!(cpu.ops(), [Op::In(0x60)]);
}

#[test]
fn snapshot_layout_matches_the_stub_frame() {
    use core::mem::{offset_of, size_of};

    assert_eq!(size_of::<Registers>(), 32);
    assert_eq!(offset_of!(CpuSnapshot, vector), 32);
    assert_eq!(offset_of!(CpuSnapshot, frame), 36);
    assert_eq!(size_of::<CpuSnapshot>(), 52);
    assert_eq!(offset_of!(Registers, eax), 0);
    assert_eq!(offset_of!(Registers, edi), 28);
}
