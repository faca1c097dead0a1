//! RISC-V architecture adapter
//!
//! Entry convention: a0 = boot hart id, a1 = device tree blob address.
//! Caches are coherent on this architecture, so teardown only
//! synchronizes the instruction stream with a fence; there is no legacy
//! tag path.

use core::convert::Infallible;

use log::info;

use crate::arch::{ArchAdapter, EntryArgs, EntryMode};
use crate::error::BootError;
use crate::images::BootImages;

/// Kernels expect the device tree blob at an 8-byte boundary.
const FDT_ALIGN: usize = 8;

/// RISC-V hand-off strategy.
pub struct RiscvAdapter {
    hartid: usize,
}

impl RiscvAdapter {
    pub fn new(hartid: usize) -> Self {
        RiscvAdapter { hartid }
    }
}

impl ArchAdapter for RiscvAdapter {
    fn image_setup(&mut self, images: &BootImages) -> Result<(), BootError> {
        // Placement contract for a present blob only; whether a boot can
        // proceed without one is compute_entry_args's decision.
        match images.fdt {
            Some(fdt) if fdt.len > 0 && fdt.addr % FDT_ALIGN == 0 => Ok(()),
            Some(_) => Err(BootError::BadDeviceTree),
            None => Ok(()),
        }
    }

    fn compute_entry_args(&mut self, images: &BootImages) -> Result<EntryArgs, BootError> {
        let fdt = images.fdt.ok_or(BootError::UnsupportedLegacyMode)?;
        Ok(EntryArgs {
            mode: EntryMode::DeviceTree,
            arg0: self.hartid,
            arg1: fdt.addr,
        })
    }

    fn disable_interrupts(&mut self) {
        irq_mask();
    }

    fn teardown_caches(&mut self) {
        // Coherent caches: only the instruction stream needs a fence so
        // the freshly written kernel image is what executes.
        fence_i();
    }

    fn jump(&mut self, entry_point: usize, args: &EntryArgs) -> Result<Infallible, BootError> {
        info!(
            "riscv: transferring control to {:#x} (a0={:#x}, a1={:#x})",
            entry_point, args.arg0, args.arg1
        );
        #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
        {
            let kernel: extern "C" fn(usize, usize) -> ! =
                unsafe { core::mem::transmute(entry_point) };
            kernel(args.arg0, args.arg1)
        }
        #[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
        {
            let _ = (entry_point, args);
            Err(BootError::UnreachableReturn)
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))] {
        fn irq_mask() {
            unsafe {
                core::arch::asm!("csrci sstatus, 0x2"); // SSTATUS.SIE
            }
        }

        fn fence_i() {
            unsafe {
                core::arch::asm!("fence.i");
            }
        }
    } else {
        // Foreign target: the primitives compile to nothing so the
        // convention logic stays host-testable.
        fn irq_mask() {}
        fn fence_i() {}
    }
}
