use core::fmt::Write;

use spin::Mutex;

use crate::kernel::arch::x86::pic::ChainedPics;
use crate::kernel::arch::x86::Privileged;
use crate::kernel::error::{KernelError, KernelResult};

use super::registry::HandlerRegistry;
use super::report::write_exception_report;
use super::snapshot::CpuSnapshot;
use super::Exception;

/// Where a vector is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// Raised by the CPU; fatal.
    Exception(Exception),
    /// Raised by the PIC or by `int n`.
    Interrupt(u8),
}

pub fn classify(vector: u8) -> Class {
    match Exception::new(vector) {
        Some(exception) => Class::Exception(exception),
        None => Class::Interrupt(vector),
    }
}

/// Outcome of a dispatch that returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran and the PIC was acknowledged.
    Handled,
    /// No handler; nothing was acknowledged.
    Unhandled,
}

/// Routes one captured interrupt.
///
/// Exceptions never return. For other vectors the registered handler runs
/// first and the PIC is acknowledged afterwards; without a handler the
/// vector is dropped. A snapshot whose vector does not fit in 0–255 is
/// rejected untouched.
pub fn dispatch<C, W>(
    cpu: &C,
    handlers: &HandlerRegistry,
    pics: &Mutex<ChainedPics>,
    sink: &mut W,
    snapshot: &CpuSnapshot,
) -> KernelResult<Dispatch>
where
    C: Privileged,
    W: Write,
{
    let vector = u8::try_from(snapshot.vector).map_err(|_| KernelError::InvalidVector(snapshot.vector))?;

    match classify(vector) {
        Class::Exception(_) => {
            // The report is best effort; a failing sink must not keep the CPU running.
            let _ = write_exception_report(sink, snapshot);
            cpu.halt()
        }
        Class::Interrupt(vector) => match handlers.get(vector) {
            Some(handler) => {
                handler.handle(vector);
                pics.lock().acknowledge(cpu, vector);
                Ok(Dispatch::Handled)
            }
            None => {
                log::trace!("interrupt {:#04x}: no handler", vector);
                Ok(Dispatch::Unhandled)
            }
        },
    }
}
