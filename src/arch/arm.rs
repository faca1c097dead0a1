//! ARMv7-class architecture adapter
//!
//! Entry convention: r0 = 0, r1 = machine type number, r2 = address of the
//! device tree blob or the legacy tag list. The legacy path builds a
//! classic tag blob from the board description; BD_T board-info records
//! have never existed on ARM and are rejected as unsupported.

use core::convert::Infallible;

use log::{debug, info};

use crate::arch::{ArchAdapter, EntryArgs, EntryMode};
use crate::bootm::BootState;
use crate::error::BootError;
use crate::images::{BoardInfo, BootImages};
use crate::tags::TagList;

/// Kernels expect the device tree blob at a 4-byte boundary.
const FDT_ALIGN: usize = 4;

/// ARMv7-class hand-off strategy.
pub struct ArmAdapter {
    board: BoardInfo,
    tags: TagList,
}

impl ArmAdapter {
    pub fn new(board: BoardInfo) -> Self {
        ArmAdapter {
            board,
            tags: TagList::new(),
        }
    }

    /// The legacy blob built by the last `compute_entry_args`, for
    /// diagnostics.
    pub fn tag_list(&self) -> &TagList {
        &self.tags
    }

    fn build_tag_list(&mut self, images: &BootImages) -> Result<usize, BootError> {
        let mut tags = TagList::new();
        tags.add_core()?;
        for bank in &self.board.mem_banks {
            tags.add_mem(*bank)?;
        }
        if let Some(initrd) = images.initrd {
            tags.add_initrd(initrd)?;
        }
        if let Some(serial) = self.board.serial {
            tags.add_serial(serial)?;
        }
        if let Some(revision) = self.board.revision {
            tags.add_revision(revision)?;
        }
        if let Some(cmdline) = images.cmdline {
            tags.add_cmdline(cmdline)?;
        }
        tags.finish()?;
        debug!("arm: legacy tag list, {} words", tags.as_words().len());
        self.tags = tags;
        Ok(self.tags.addr())
    }
}

impl ArchAdapter for ArmAdapter {
    fn legacy_caps(&self) -> BootState {
        BootState::CMDLINE
    }

    fn image_setup(&mut self, images: &BootImages) -> Result<(), BootError> {
        // Content fixups (memory nodes, chosen/bootargs) are the loader's
        // job in this layering; the adapter checks the placement contract.
        match images.fdt {
            Some(fdt) if fdt.len > 0 && fdt.addr % FDT_ALIGN == 0 => Ok(()),
            Some(_) => Err(BootError::BadDeviceTree),
            None => Ok(()),
        }
    }

    fn compute_entry_args(&mut self, images: &BootImages) -> Result<EntryArgs, BootError> {
        // A device tree always wins over the legacy tag path.
        if let Some(fdt) = images.fdt {
            return Ok(EntryArgs {
                mode: EntryMode::DeviceTree,
                arg0: self.board.machine_id as usize,
                arg1: fdt.addr,
            });
        }
        let tags_addr = self.build_tag_list(images)?;
        Ok(EntryArgs {
            mode: EntryMode::LegacyTags,
            arg0: self.board.machine_id as usize,
            arg1: tags_addr,
        })
    }

    fn disable_interrupts(&mut self) {
        irq_mask();
    }

    fn teardown_caches(&mut self) {
        // ARMv7 order: clean and disable the data cache while it can
        // still service the flush, then kill the instruction cache.
        flush_and_disable_dcache();
        disable_and_invalidate_icache();
    }

    fn jump(&mut self, entry_point: usize, args: &EntryArgs) -> Result<Infallible, BootError> {
        info!(
            "arm: transferring control to {:#x} (r1={:#x}, r2={:#x})",
            entry_point, args.arg0, args.arg1
        );
        #[cfg(target_arch = "arm")]
        {
            let kernel: extern "C" fn(usize, usize, usize) -> ! =
                unsafe { core::mem::transmute(entry_point) };
            kernel(0, args.arg0, args.arg1)
        }
        #[cfg(not(target_arch = "arm"))]
        {
            let _ = (entry_point, args);
            Err(BootError::UnreachableReturn)
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "arm")] {
        fn irq_mask() {
            unsafe {
                core::arch::asm!("cpsid if");
            }
        }

        fn flush_and_disable_dcache() {
            unsafe {
                let mut sctlr: u32;
                core::arch::asm!("mrc p15, 0, {}, c1, c0, 0", out(reg) sctlr);
                sctlr &= !(1 << 2); // SCTLR.C
                core::arch::asm!(
                    "dsb",
                    "mcr p15, 0, {}, c1, c0, 0",
                    "dsb",
                    in(reg) sctlr,
                );
            }
        }

        fn disable_and_invalidate_icache() {
            unsafe {
                let mut sctlr: u32;
                core::arch::asm!("mrc p15, 0, {}, c1, c0, 0", out(reg) sctlr);
                sctlr &= !(1 << 12); // SCTLR.I
                core::arch::asm!(
                    "mcr p15, 0, {0}, c1, c0, 0",
                    "mcr p15, 0, {1}, c7, c5, 0", // ICIALLU
                    "dsb",
                    "isb",
                    in(reg) sctlr,
                    in(reg) 0u32,
                );
            }
        }
    } else {
        // Foreign target: the primitives compile to nothing so the
        // convention logic stays host-testable.
        fn irq_mask() {}
        fn flush_and_disable_dcache() {}
        fn disable_and_invalidate_icache() {}
    }
}
