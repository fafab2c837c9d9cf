//! Kernel context and boot sequence
//!
//! [`Kernel`] owns every table the CPU reads (GDT, IDT), the PIC state and
//! the handler registry. It is built once at boot, placed in a static, and
//! never torn down. The boot order is fixed:
//!
//! 1. segment table loaded, segment registers reloaded
//! 2. vector table loaded (its gates name the code selector from step 1)
//! 3. PIC remapped, only lines with a registered handler unmasked
//! 4. PIT programmed, maskable interrupts enabled
//!
//! [`BootStage`] tracks progress so a step taken out of order is refused
//! instead of faulting.
//!
//! The PIC state and the handler registry are also locked by
//! [`interrupts::dispatch`] in interrupt context. Every other access holds
//! those locks with maskable interrupts disabled.

pub mod arch;
pub mod config;
pub mod error;
pub mod gdt;
pub mod idt;
pub mod interrupts;


pub use config::BootConfig;
pub use error::{KernelError, KernelResult};

use core::fmt::Write;
use core::sync::atomic::{AtomicU8, Ordering};

use spin::Mutex;

use arch::x86::pic::{ChainedPics, InterruptLines};
use arch::x86::{pit, Privileged};
use gdt::{SegmentTable, Selectors, KERNEL_CODE_SELECTOR};
use idt::{EntryPoints, VectorTable};
use interrupts::{CpuSnapshot, Dispatch, HandlerRegistry, InterruptHandler};

/// How far the boot sequence has progressed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootStage {
    Cold = 0,
    Segmented = 1,
    VectorsLoaded = 2,
    ControllerRemapped = 3,
    Running = 4,
}

impl BootStage {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Cold,
            1 => Self::Segmented,
            2 => Self::VectorsLoaded,
            3 => Self::ControllerRemapped,
            _ => Self::Running,
        }
    }
}

pub struct Kernel<C> {
    cpu: C,
    entry_points: EntryPoints,
    segments: Mutex<SegmentTable>,
    vectors: Mutex<VectorTable>,
    pics: Mutex<ChainedPics>,
    handlers: HandlerRegistry,
    stage: AtomicU8,
}

impl<C: Privileged> Kernel<C> {
    /// Nothing is loaded yet; the tables start empty.
    pub fn new(cpu: C, entry_points: EntryPoints) -> Self {
        Self {
            cpu,
            entry_points,
            segments: Mutex::new(SegmentTable::empty()),
            vectors: Mutex::new(VectorTable::new()),
            pics: Mutex::new(ChainedPics::default()),
            handlers: HandlerRegistry::new(),
            stage: AtomicU8::new(BootStage::Cold as u8),
        }
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    pub fn stage(&self) -> BootStage {
        BootStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    fn advance(&self, stage: BootStage) {
        self.stage.fetch_max(stage as u8, Ordering::AcqRel);
    }

    /// Runs the whole boot sequence with `config`.
    ///
    /// Register the handlers for the PIC lines that should come up enabled
    /// before calling this.
    pub fn boot(&'static self, config: &BootConfig) -> KernelResult<()> {
        config.validate()?;
        self.cpu.disable_interrupts();

        self.init_segmentation();
        self.init_interrupts()?;
        let lines = self.remap_controller(config.master_offset, config.slave_offset);
        pit::init(&self.cpu, config.tick_hz);
        self.enable_interrupts()?;

        log::info!("boot: interrupts enabled, lines {:#06x}", lines.bits());
        Ok(())
    }

    /// Loads the flat segment table and switches every segment register to it.
    pub fn init_segmentation(&'static self) -> Selectors {
        let mut table = self.segments.lock();
        // The table lives inside `self`, which is 'static.
        let selectors = unsafe { gdt::init(&self.cpu, &mut table) };
        self.advance(BootStage::Segmented);
        log::info!("gdt: flat segments loaded");
        selectors
    }

    /// Builds and loads the vector table. Refused until segmentation is done
    /// and the gate selector names a present code segment.
    pub fn init_interrupts(&'static self) -> KernelResult<()> {
        let segmented = self.stage() >= BootStage::Segmented;
        if !segmented || !self.segments.lock().is_code_selector(KERNEL_CODE_SELECTOR) {
            return Err(KernelError::SegmentsNotLoaded);
        }

        let mut table = self.vectors.lock();
        unsafe { idt::init(&self.cpu, &mut table, &self.entry_points, KERNEL_CODE_SELECTOR) };
        self.advance(BootStage::VectorsLoaded);
        log::info!("idt: {} gates loaded", table.present());
        Ok(())
    }

    /// Remaps the PICs and unmasks the lines that currently have a handler.
    pub fn remap_controller(&self, master_offset: u8, slave_offset: u8) -> InterruptLines {
        let lines = self.cpu.without_interrupts(|| {
            let lines = self.handlers.lines(master_offset, slave_offset);
            let mut pics = self.pics.lock();
            unsafe { pics.remap(&self.cpu, master_offset, slave_offset, lines) };
            lines
        });
        self.advance(BootStage::ControllerRemapped);
        lines
    }

    /// Sets IF. Refused until the vector table is loaded and the PICs are
    /// remapped; before the remap, IRQ 0–7 would arrive on exception vectors.
    pub fn enable_interrupts(&self) -> KernelResult<()> {
        match self.stage() {
            BootStage::Cold | BootStage::Segmented => return Err(KernelError::VectorsNotLoaded),
            BootStage::VectorsLoaded => return Err(KernelError::ControllerNotRemapped),
            BootStage::ControllerRemapped | BootStage::Running => {}
        }
        self.advance(BootStage::Running);
        self.cpu.enable_interrupts();
        Ok(())
    }

    /// Sends end-of-interrupt for `vector`; vectors the PICs do not raise are ignored.
    pub fn acknowledge(&self, vector: u8) {
        self.cpu.without_interrupts(|| self.pics.lock().acknowledge(&self.cpu, vector));
    }

    /// Installs `handler` for `vector`, replacing any previous one.
    ///
    /// Vectors 0–31 are accepted but never consulted: exceptions always halt.
    /// Once the PICs are remapped, the line behind `vector` is unmasked.
    pub fn register_handler(
        &self,
        vector: u8,
        handler: &'static dyn InterruptHandler,
    ) -> Option<&'static dyn InterruptHandler> {
        if interrupts::Exception::new(vector).is_some() {
            log::warn!("handler registered for exception vector {}; it will never run", vector);
        }
        self.cpu.without_interrupts(|| {
            let previous = self.handlers.register(vector, handler);
            self.sync_lines();
            previous
        })
    }

    /// Removes the handler for `vector` and, after remap, masks its line.
    pub fn unregister_handler(&self, vector: u8) -> Option<&'static dyn InterruptHandler> {
        self.cpu.without_interrupts(|| {
            let previous = self.handlers.unregister(vector);
            self.sync_lines();
            previous
        })
    }

    fn sync_lines(&self) {
        if self.stage() < BootStage::ControllerRemapped {
            return;
        }
        let mut pics = self.pics.lock();
        let (master, slave) = pics.offsets();
        pics.set_enabled(&self.cpu, self.handlers.lines(master, slave));
    }

    /// Lines currently unmasked at the PICs.
    pub fn enabled_lines(&self) -> InterruptLines {
        self.cpu.without_interrupts(|| self.pics.lock().enabled())
    }

    pub fn is_registered(&self, vector: u8) -> bool {
        self.cpu.without_interrupts(|| self.handlers.is_registered(vector))
    }

    /// Routes one captured interrupt; see [`interrupts::dispatch`].
    pub fn dispatch<W: Write>(&self, sink: &mut W, snapshot: &CpuSnapshot) -> KernelResult<Dispatch> {
        interrupts::dispatch(&self.cpu, &self.handlers, &self.pics, sink, snapshot)
    }

    /// Idles forever, waking for interrupts.
    pub fn run(&self) -> ! {
        loop {
            self.cpu.wait_for_interrupt();
        }
    }
}

// === Target glue ===

#[cfg(all(target_arch = "x86", target_os = "none"))]
pub use target::{interrupt_dispatch, KERNEL};

#[cfg(all(target_arch = "x86", target_os = "none"))]
mod target {
    use super::arch::x86::{Hardware, Privileged};
    use super::interrupts::CpuSnapshot;
    use super::Kernel;
    use crate::serial::{Serial, COM1};

    /// The one kernel context.
    pub static KERNEL: spin::Once<Kernel<Hardware>> = spin::Once::new();

    /// Called by `interrupt_common` for every vector with a stub.
    #[no_mangle]
    pub extern "C" fn interrupt_dispatch(snapshot: &CpuSnapshot) {
        let Some(kernel) = KERNEL.get() else {
            Hardware.halt();
        };

        // A fresh writer, not the logger's: a fault may arrive while the logger lock is held.
        let mut sink = Serial::new(Hardware, COM1);
        if let Err(err) = kernel.dispatch(&mut sink, snapshot) {
            log::warn!("dispatch: {}", err);
        }
    }
}
