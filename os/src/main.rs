#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(all(target_arch = "x86", target_os = "none"))]
mod boot {
    use core::fmt::Write;
    use core::panic::PanicInfo;

    use saturn::kernel::arch::x86::pic::{IRQ_KEYBOARD, IRQ_TIMER};
    use saturn::kernel::arch::x86::{Hardware, Privileged};
    use saturn::kernel::idt::stubs;
    use saturn::kernel::interrupts::handlers::{Keyboard, Timer};
    use saturn::kernel::interrupts::InterruptHandler;
    use saturn::kernel::{BootConfig, Kernel, KERNEL};
    use saturn::serial::{Serial, SerialLogger, COM1};

    const MULTIBOOT_MAGIC: u32 = 0x1BAD_B002;
    /// Page-align modules, provide the memory map.
    const MULTIBOOT_FLAGS: u32 = 0x0000_0003;

    core::arch::global_asm!(
        ".section .multiboot, \"a\"",
        ".p2align 2",
        ".long {magic}",
        ".long {flags}",
        ".long {checksum}",
        "",
        ".section .bss.boot_stack, \"aw\", @nobits",
        ".p2align 4",
        "boot_stack_bottom:",
        ".skip 65536",
        "boot_stack_top:",
        "",
        ".section .text._start",
        ".global _start",
        "_start:",
        "    mov esp, offset boot_stack_top",
        "    call kernel_main",
        "halt_forever:",
        "    cli",
        "    hlt",
        "    jmp halt_forever",
        magic = const MULTIBOOT_MAGIC,
        flags = const MULTIBOOT_FLAGS,
        checksum = const 0u32.wrapping_sub(MULTIBOOT_MAGIC).wrapping_sub(MULTIBOOT_FLAGS),
    );

    static LOGGER: SerialLogger<Hardware> = SerialLogger::new(Hardware, Serial::new(Hardware, COM1));
    static TIMER: Timer = Timer::new();
    static KEYBOARD: Keyboard<Hardware> = Keyboard::new(Hardware);

    #[no_mangle]
    extern "C" fn kernel_main() -> ! {
        let config = BootConfig::DEFAULT;
        let _ = LOGGER.install(config.log_level);
        log::info!("saturn: booting");

        let kernel = KERNEL.call_once(|| Kernel::new(Hardware, stubs::entry_points()));

        let devices: [(u8, &'static dyn InterruptHandler); 2] = [(IRQ_TIMER, &TIMER), (IRQ_KEYBOARD, &KEYBOARD)];
        for (irq, handler) in devices {
            if let Some(vector) = config.irq_vector(irq) {
                kernel.register_handler(vector, handler);
            }
        }

        if let Err(err) = kernel.boot(&config) {
            log::error!("boot: {}", err);
            Hardware.halt();
        }

        kernel.run()
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        let mut serial = Serial::new(Hardware, COM1);
        let _ = writeln!(serial, "panic: {}", info);
        Hardware.halt()
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
