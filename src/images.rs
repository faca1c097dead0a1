//! Boot context passed through the hand-off sequence
//!
//! `BootImages` carries everything the (external) image loader produced for
//! one boot attempt. It is constructed once, read-only inside the state
//! machine, and simply dropped by the caller on failure. `BoardInfo` holds
//! the board facts the legacy tag list is built from; it travels explicitly
//! with the architecture adapter instead of living in ambient global state.

use heapless::Vec;

/// Maximum physical memory banks a board can describe.
pub const MAX_MEM_BANKS: usize = 4;

/// Location of a flattened device tree blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdtBlob {
    /// Physical address of the blob.
    pub addr: usize,
    /// Blob length in bytes.
    pub len: usize,
}

/// Physical range of a preloaded ramdisk image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitrdRange {
    pub start: usize,
    pub end: usize,
}

impl InitrdRange {
    /// Ramdisk size in bytes. Loaders supply `start <= end`; an inverted
    /// range reads as empty rather than panicking on the boot path.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One physical memory bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemBank {
    pub start: usize,
    pub size: usize,
}

/// Everything the hand-off sequence needs to know about a loaded OS image.
///
/// When both a device tree and legacy command-line data are present, the
/// device tree wins: the adapters never fall back to tags while `fdt` is
/// set.
#[derive(Debug, Clone)]
pub struct BootImages<'a> {
    /// Address of the first instruction to execute in the loaded image.
    pub entry_point: usize,
    /// Flattened device tree, preferred over any legacy parameter passing.
    pub fdt: Option<FdtBlob>,
    /// Kernel command line, handed over by whatever convention the
    /// architecture uses (tag record or device-tree property).
    pub cmdline: Option<&'a str>,
    /// Preloaded ramdisk range, if the loader staged one.
    pub initrd: Option<InitrdRange>,
}

impl BootImages<'_> {
    /// Whether this attempt boots with a device tree.
    pub fn has_fdt(&self) -> bool {
        self.fdt.is_some()
    }
}

/// Board facts consumed by the legacy tag builder.
///
/// Explicit replacement for the ambient board-data pointer older
/// bootloaders thread through a global: adapters own their copy and the
/// core stays testable in isolation.
#[derive(Debug, Clone)]
pub struct BoardInfo {
    /// Legacy machine type number handed to the kernel.
    pub machine_id: u32,
    /// Physical memory banks, one MEM tag each.
    pub mem_banks: Vec<MemBank, MAX_MEM_BANKS>,
    /// Board serial number, if the board exposes one.
    pub serial: Option<u64>,
    /// Board revision word, if the board exposes one.
    pub revision: Option<u32>,
}

impl BoardInfo {
    /// Board description with no banks and no optional identifiers.
    pub fn new(machine_id: u32) -> Self {
        BoardInfo {
            machine_id,
            mem_banks: Vec::new(),
            serial: None,
            revision: None,
        }
    }
}
