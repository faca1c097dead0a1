//! ARM64 (AArch64) architecture adapter
//!
//! Entry convention: x0 = device tree blob address, x1..x3 = 0. There is
//! no legacy tag path on this architecture; a boot without a device tree
//! cannot proceed.
//!
//! Platforms that manage coherency by VA only keep the instruction cache
//! architecturally clean across the hand-off, so icache teardown is
//! skipped there; everywhere else the icache is invalidated after the
//! data cache goes down. The selection is fixed at adapter construction.

use core::convert::Infallible;

use log::info;

use crate::arch::{ArchAdapter, EntryArgs, EntryMode};
use crate::error::BootError;
use crate::images::BootImages;

/// Kernels expect the device tree blob at an 8-byte boundary.
const FDT_ALIGN: usize = 8;

/// ARM64 hand-off strategy.
pub struct Arm64Adapter {
    cmo_by_va_only: bool,
}

impl Arm64Adapter {
    pub fn new() -> Self {
        Arm64Adapter {
            cmo_by_va_only: false,
        }
    }

    /// Adapter for platforms whose coherency is maintained by VA only;
    /// icache teardown is skipped during the hand-off.
    pub fn with_va_only_coherency() -> Self {
        Arm64Adapter {
            cmo_by_va_only: true,
        }
    }
}

impl ArchAdapter for Arm64Adapter {
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
        // No tag-list convention exists here; device tree or nothing.
        let fdt = images.fdt.ok_or(BootError::UnsupportedLegacyMode)?;
        Ok(EntryArgs {
            mode: EntryMode::DeviceTree,
            arg0: fdt.addr,
            arg1: 0,
        })
    }

    fn disable_interrupts(&mut self) {
        irq_mask();
    }

    fn teardown_caches(&mut self) {
        // Data cache first, while it can still service the clean.
        flush_and_disable_dcache();
        if !self.cmo_by_va_only {
            invalidate_icache();
        }
    }

    fn jump(&mut self, entry_point: usize, args: &EntryArgs) -> Result<Infallible, BootError> {
        info!(
            "arm64: transferring control to {:#x} (x0={:#x})",
            entry_point, args.arg0
        );
        #[cfg(target_arch = "aarch64")]
        {
            let kernel: extern "C" fn(usize, usize, usize, usize) -> ! =
                unsafe { core::mem::transmute(entry_point) };
            kernel(args.arg0, 0, 0, 0)
        }
        #[cfg(not(target_arch = "aarch64"))]
        {
            let _ = (entry_point, args);
            Err(BootError::UnreachableReturn)
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        fn irq_mask() {
            unsafe {
                core::arch::asm!("msr daifset, #0xf");
            }
        }

        fn flush_and_disable_dcache() {
            unsafe {
                let mut sctlr: u64;
                core::arch::asm!("mrs {}, sctlr_el1", out(reg) sctlr);
                sctlr &= !(1 << 2); // SCTLR_EL1.C
                core::arch::asm!(
                    "dsb sy",
                    "msr sctlr_el1, {}",
                    "dsb sy",
                    "isb",
                    in(reg) sctlr,
                );
            }
        }

        fn invalidate_icache() {
            unsafe {
                core::arch::asm!(
                    "ic iallu",
                    "dsb sy",
                    "isb",
                );
            }
        }
    } else {
        // Foreign target: the primitives compile to nothing so the
        // convention logic stays host-testable.
        fn irq_mask() {}
        fn flush_and_disable_dcache() {}
        fn invalidate_icache() {}
    }
}
