//! Privileged CPU operations.
//!
//! Everything that touches I/O ports, descriptor-table registers, segment
//! registers or the interrupt flag goes through [`PortIo`] and [`Privileged`].
//! The encoders, the PIC driver and the dispatcher only ever see these traits,
//! so they run unchanged against [`Hardware`] on the target and against the
//! recording mock in host tests.

use x86_64::structures::gdt::SegmentSelector;

/// Unused port written to for a short I/O delay (POST diagnostic port).
pub const IO_WAIT_PORT: u16 = 0x80;

/// Pointer record handed to `lgdt` / `lidt` in protected mode.
///
/// Six bytes: a 16-bit limit (table size in bytes minus one) followed by
/// the 32-bit linear base address.
#[repr(C, packed(2))]
#[derive(Clone, Copy)]
pub struct DescriptorTablePointer {
    limit: u16,
    base: u32,
}

impl DescriptorTablePointer {
    pub const fn new(base: u32, limit: u16) -> Self {
        Self { limit, base }
    }

    /// Builds the pointer for a table of `count` entries of `entry_size` bytes at `base`.
    pub const fn for_table(base: u32, count: usize, entry_size: usize) -> Self {
        Self::new(base, (count * entry_size - 1) as u16)
    }

    pub const fn limit(&self) -> u16 {
        self.limit
    }

    pub const fn base(&self) -> u32 {
        self.base
    }
}

impl core::fmt::Debug for DescriptorTablePointer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (limit, base) = (self.limit, self.base);
        f.debug_struct("DescriptorTablePointer")
            .field("limit", &limit)
            .field("base", &format_args!("{:#010x}", base))
            .finish()
    }
}

/// Byte-wide port I/O.
pub trait PortIo {
    /// # Safety
    /// Reading some ports has side effects on the device behind them.
    unsafe fn read_u8(&self, port: u16) -> u8;

    /// # Safety
    /// Caller must know what the device behind `port` does with `value`.
    unsafe fn write_u8(&self, port: u16, value: u8);

    /// Gives slow devices (the 8259 on old boards) time to settle between writes.
    fn io_wait(&self) {
        unsafe { self.write_u8(IO_WAIT_PORT, 0) }
    }
}

impl<P: PortIo + ?Sized> PortIo for &P {
    unsafe fn read_u8(&self, port: u16) -> u8 {
        (**self).read_u8(port)
    }

    unsafe fn write_u8(&self, port: u16, value: u8) {
        (**self).write_u8(port, value)
    }
}

/// Ring-0 operations on descriptor tables, segment registers and the interrupt flag.
pub trait Privileged: PortIo {
    /// Points GDTR at a segment table.
    ///
    /// # Safety
    /// The table must stay at that address and contain valid descriptors for
    /// as long as it is loaded.
    unsafe fn load_gdt(&self, pointer: &DescriptorTablePointer);

    /// Reloads CS (far return) and DS/ES/FS/GS/SS.
    ///
    /// # Safety
    /// Both selectors must reference valid descriptors in the loaded GDT.
    unsafe fn reload_segments(&self, code: SegmentSelector, data: SegmentSelector);

    /// Points IDTR at a vector table.
    ///
    /// # Safety
    /// Same lifetime requirement as [`Privileged::load_gdt`]; every present
    /// gate must reference a valid code selector and handler.
    unsafe fn load_idt(&self, pointer: &DescriptorTablePointer);

    fn enable_interrupts(&self);

    fn disable_interrupts(&self);

    fn interrupts_enabled(&self) -> bool;

    /// Sleeps until the next interrupt.
    fn wait_for_interrupt(&self);

    /// Stops the processor for good.
    fn halt(&self) -> !;

    /// Runs `f` with maskable interrupts disabled, restoring the previous state.
    fn without_interrupts<R>(&self, f: impl FnOnce() -> R) -> R {
        let enabled = self.interrupts_enabled();
        if enabled {
            self.disable_interrupts();
        }
        let result = f();
        if enabled {
            self.enable_interrupts();
        }
        result
    }
}

impl<C: Privileged + ?Sized> Privileged for &C {
    unsafe fn load_gdt(&self, pointer: &DescriptorTablePointer) {
        (**self).load_gdt(pointer)
    }

    unsafe fn reload_segments(&self, code: SegmentSelector, data: SegmentSelector) {
        (**self).reload_segments(code, data)
    }

    unsafe fn load_idt(&self, pointer: &DescriptorTablePointer) {
        (**self).load_idt(pointer)
    }

    fn enable_interrupts(&self) {
        (**self).enable_interrupts()
    }

    fn disable_interrupts(&self) {
        (**self).disable_interrupts()
    }

    fn interrupts_enabled(&self) -> bool {
        (**self).interrupts_enabled()
    }

    fn wait_for_interrupt(&self) {
        (**self).wait_for_interrupt()
    }

    fn halt(&self) -> ! {
        (**self).halt()
    }
}

/// The real processor.
#[cfg(target_arch = "x86")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Hardware;

#[cfg(target_arch = "x86")]
const EFLAGS_IF: u32 = 1 << 9;

#[cfg(target_arch = "x86")]
impl PortIo for Hardware {
    #[inline(always)]
    unsafe fn read_u8(&self, port: u16) -> u8 {
        let value: u8;
        core::arch::asm!("in al, dx", in("dx") port, out("al") value, options(nomem, nostack, preserves_flags));
        value
    }

    #[inline(always)]
    unsafe fn write_u8(&self, port: u16, value: u8) {
        core::arch::asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
    }
}

#[cfg(target_arch = "x86")]
impl Privileged for Hardware {
    unsafe fn load_gdt(&self, pointer: &DescriptorTablePointer) {
        core::arch::asm!(
            "lgdt [{}]",
            in(reg) pointer as *const DescriptorTablePointer,
            options(readonly, nostack, preserves_flags)
        );
    }

    unsafe fn reload_segments(&self, code: SegmentSelector, data: SegmentSelector) {
        // CS can only be changed by a far transfer: push selector and target, then retf.
        core::arch::asm!(
            "push {code}",
            "lea {tmp}, [2f]",
            "push {tmp}",
            "retf",
            "2:",
            "mov ds, {data:x}",
            "mov es, {data:x}",
            "mov fs, {data:x}",
            "mov gs, {data:x}",
            "mov ss, {data:x}",
            code = in(reg) u32::from(code.0),
            data = in(reg) u32::from(data.0),
            tmp = out(reg) _,
            options(preserves_flags)
        );
    }

    unsafe fn load_idt(&self, pointer: &DescriptorTablePointer) {
        core::arch::asm!(
            "lidt [{}]",
            in(reg) pointer as *const DescriptorTablePointer,
            options(readonly, nostack, preserves_flags)
        );
    }

    fn enable_interrupts(&self) {
        unsafe { core::arch::asm!("sti", options(nomem, nostack)) }
    }

    fn disable_interrupts(&self) {
        unsafe { core::arch::asm!("cli", options(nomem, nostack)) }
    }

    fn interrupts_enabled(&self) -> bool {
        let flags: u32;
        unsafe { core::arch::asm!("pushfd", "pop {}", out(reg) flags, options(nomem, preserves_flags)) };
        flags & EFLAGS_IF != 0
    }

    fn wait_for_interrupt(&self) {
        unsafe { core::arch::asm!("hlt", options(nomem, nostack, preserves_flags)) }
    }

    fn halt(&self) -> ! {
        loop {
            unsafe { core::arch::asm!("cli", "hlt", options(nomem, nostack)) }
        }
    }
}
