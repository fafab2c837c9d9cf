//! Fatal exception report.
//!
//! One `Key: value` pair per line, values in hex with a `0x` prefix:
//!
//! ```text
//! Exception! System Halted!
//! Interrupt No: 14
//! Exception: Page Fault
//! Error Code: 0x00000002
//! EIP: 0x00101a2c
//! CS: 0x0008
//! EFLAGS: 0x00010006
//! EAX: 0x00000000
//! ...
//! EDI: 0x00000000
//! ```
//!
//! The `Error Code` line appears only for vectors that push one.

use core::fmt::{self, Write};

use super::snapshot::{has_error_code, CpuSnapshot};
use super::Exception;

pub const BANNER: &str = "Exception! System Halted!";

pub fn write_exception_report<W: Write>(sink: &mut W, snapshot: &CpuSnapshot) -> fmt::Result {
    writeln!(sink, "{}", BANNER)?;
    writeln!(sink, "Interrupt No: {}", snapshot.vector)?;
    if let Some(exception) = u8::try_from(snapshot.vector).ok().and_then(Exception::new) {
        writeln!(sink, "Exception: {}", exception.name())?;
    }
    if has_error_code(snapshot.vector) {
        writeln!(sink, "Error Code: {:#010x}", snapshot.frame.error_code)?;
    }
    writeln!(sink, "EIP: {:#010x}", snapshot.frame.eip)?;
    writeln!(sink, "CS: {:#06x}", snapshot.frame.cs)?;
    writeln!(sink, "EFLAGS: {:#010x}", snapshot.frame.eflags)?;
    for (name, value) in snapshot.registers.named() {
        writeln!(sink, "{}: {:#010x}", name, value)?;
    }
    Ok(())
}
