//! Error types for boot sequencing and dispatch

/// Errors the kernel core can report.
///
/// Exceptions are not errors: they halt the processor and never come back
/// as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A snapshot carried a vector outside 0–255.
    InvalidVector(u32),

    /// The vector table was requested before the segment table was loaded.
    ///
    /// Gates name the kernel code selector, which only resolves once the
    /// flat GDT is in GDTR.
    SegmentsNotLoaded,

    /// Interrupts were about to be enabled with no vector table loaded.
    VectorsNotLoaded,

    /// Interrupts were about to be enabled while the PICs still deliver
    /// IRQs on the exception vectors.
    ControllerNotRemapped,

    /// PIC offsets that would collide with exceptions, with each other, or
    /// with vectors that have no entry stub.
    InvalidPicOffsets {
        /// Requested master offset
        master: u8,
        /// Requested slave offset
        slave: u8,
    },
}

impl KernelError {
    /// Returns a human-readable description of the error
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidVector(_) => "vector outside 0-255",
            Self::SegmentsNotLoaded => "segment table not loaded",
            Self::VectorsNotLoaded => "vector table not loaded",
            Self::ControllerNotRemapped => "interrupt controller not remapped",
            Self::InvalidPicOffsets { .. } => "invalid PIC vector offsets",
        }
    }
}

/// Convenience type alias for Results with KernelError
pub type KernelResult<T> = Result<T, KernelError>;

impl core::fmt::Display for KernelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidVector(vector) => write!(f, "{}: {:#x}", self.description(), vector),
            Self::InvalidPicOffsets { master, slave } => {
                write!(f, "{}: master {:#04x}, slave {:#04x}", self.description(), master, slave)
            }
            _ => write!(f, "{}", self.description()),
        }
    }
}
