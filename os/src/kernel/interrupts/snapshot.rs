//! Register state captured by the entry stubs.

/// Exceptions for which the CPU pushes an error code.
pub const ERROR_CODE_VECTORS: [u8; 7] = [8, 10, 11, 12, 13, 14, 17];

/// Whether the CPU pushes an error code for `vector`.
pub fn has_error_code(vector: u32) -> bool {
    ERROR_CODE_VECTORS.iter().any(|&v| u32::from(v) == vector)
}

/// General-purpose registers in the order `interrupt_common` stores them.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esp: u32,
    pub ebp: u32,
    pub esi: u32,
    pub edi: u32,
}

impl Registers {
    /// Name/value pairs, in report order.
    pub fn named(&self) -> [(&'static str, u32); 8] {
        [
            ("EAX", self.eax),
            ("EBX", self.ebx),
            ("ECX", self.ecx),
            ("EDX", self.edx),
            ("ESP", self.esp),
            ("EBP", self.ebp),
            ("ESI", self.esi),
            ("EDI", self.edi),
        ]
    }
}

/// What the CPU pushes on entry through a same-privilege gate, plus the
/// error code (zero when the CPU pushes none).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackFrame {
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

/// Everything known about one interrupt occurrence.
///
/// Lives on the interrupted stack for the duration of a single dispatch.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub registers: Registers,
    pub vector: u32,
    pub frame: StackFrame,
}

impl CpuSnapshot {
    /// The error code if the CPU pushed one for this vector, zero otherwise.
    pub fn error_code(&self) -> u32 {
        if has_error_code(self.vector) {
            self.frame.error_code
        } else {
            0
        }
    }
}
