//! Interrupt entry stubs
//!
//! One stub per populated vector (0–47). Each stub makes the stack uniform
//! (pushing a zero error code where the CPU pushes none), pushes its vector
//! and jumps to `interrupt_common`, which saves the general-purpose
//! registers and calls `interrupt_dispatch` with a pointer to the resulting
//! [`CpuSnapshot`](crate::kernel::interrupts::CpuSnapshot):
//!
//! ```text
//! esp ->  eax ebx ecx edx esp ebp esi edi | vector | error eip cs eflags
//!         `------- pushed by common -----'  `stub'   `---- by the CPU ---'
//! ```
//!
//! The addresses of the stubs are exported as `interrupt_entry_points`, in
//! vector order, for the IDT to point at.

/// Vectors that have an entry stub.
pub const STUB_COUNT: usize = 48;

/// Linear address of each stub, indexed by vector.
pub type EntryPoints = [u32; STUB_COUNT];

#[cfg(all(target_arch = "x86", target_os = "none"))]
macro_rules! stubs_without_error_code {
    ($($vector:literal),* $(,)?) => {
        concat!($(
            ".p2align 4\n",
            "interrupt_entry_", stringify!($vector), ":\n",
            "    push 0\n",
            "    push ", stringify!($vector), "\n",
            "    jmp interrupt_common\n",
        )*)
    };
}

#[cfg(all(target_arch = "x86", target_os = "none"))]
macro_rules! stubs_with_error_code {
    ($($vector:literal),* $(,)?) => {
        concat!($(
            ".p2align 4\n",
            "interrupt_entry_", stringify!($vector), ":\n",
            "    push ", stringify!($vector), "\n",
            "    jmp interrupt_common\n",
        )*)
    };
}

#[cfg(all(target_arch = "x86", target_os = "none"))]
macro_rules! entry_table {
    ($($vector:literal),* $(,)?) => {
        concat!($("    .long interrupt_entry_", stringify!($vector), "\n",)*)
    };
}

#[cfg(all(target_arch = "x86", target_os = "none"))]
core::arch::global_asm!(
    ".section .text",
    stubs_without_error_code!(
        0, 1, 2, 3, 4, 5, 6, 7, 9, 15, 16, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31,
        32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47
    ),
    stubs_with_error_code!(8, 10, 11, 12, 13, 14, 17),
    ".p2align 4",
    "interrupt_common:",
    "    push edi",
    "    push esi",
    "    push ebp",
    "    push esp",
    "    push edx",
    "    push ecx",
    "    push ebx",
    "    push eax",
    "    cld",
    "    push esp",
    "    call interrupt_dispatch",
    "    add esp, 4",
    "    pop eax",
    "    pop ebx",
    "    pop ecx",
    "    pop edx",
    "    add esp, 4",
    "    pop ebp",
    "    pop esi",
    "    pop edi",
    "    add esp, 8",
    "    iretd",
    ".section .rodata",
    ".p2align 2",
    ".global interrupt_entry_points",
    "interrupt_entry_points:",
    entry_table!(
        0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
        24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45,
        46, 47
    ),
    ".section .text",
);

/// Addresses of the assembled stubs.
#[cfg(all(target_arch = "x86", target_os = "none"))]
pub fn entry_points() -> EntryPoints {
    extern "C" {
        #[link_name = "interrupt_entry_points"]
        static ENTRY_POINTS: EntryPoints;
    }
    unsafe { ENTRY_POINTS }
}
