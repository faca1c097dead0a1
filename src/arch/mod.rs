//! Architecture adapters for the boot hand-off
//!
//! Supports multiple architectures with platform-specific implementations
//! while keeping the state machine itself architecture-agnostic. Each
//! adapter encodes one architecture's entry calling convention, the cache
//! teardown order its manual mandates, and the final jump.

pub mod arm;
pub mod arm64;
pub mod riscv;

use core::convert::Infallible;

use crate::bootm::BootState;
use crate::error::BootError;
use crate::images::BootImages;

/// How boot parameters are handed to the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// A flattened device tree describes the hardware.
    DeviceTree,
    /// A legacy fixed-layout tag list describes the hardware.
    LegacyTags,
}

/// Precomputed register arguments for the OS entry point.
///
/// The meaning of `arg0`/`arg1` is adapter-specific; the selector is
/// common so callers and tests can check the device-tree-wins rule
/// without knowing the architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryArgs {
    pub mode: EntryMode,
    pub arg0: usize,
    pub arg1: usize,
}

/// One architecture's hand-off strategy.
///
/// Adapters are plain values owning whatever board state their convention
/// needs; the state machine drives them in a fixed order and never
/// reorders the teardown steps.
pub trait ArchAdapter {
    /// Legacy tag behaviors this adapter can honor (BD_T/CMDLINE subset).
    /// Requests outside this set fail fast before any side effect.
    fn legacy_caps(&self) -> BootState {
        BootState::empty()
    }

    /// Device-tree fixups and memory reservation. Invoked during PREP,
    /// only when the images carry an FDT. May fail; nothing irreversible
    /// has happened yet.
    fn image_setup(&mut self, _images: &BootImages) -> Result<(), BootError> {
        Ok(())
    }

    /// Compute the entry register set. A present FDT always selects
    /// device-tree mode. May build the legacy tag blob, so it runs before
    /// teardown and may still fail.
    fn compute_entry_args(&mut self, images: &BootImages) -> Result<EntryArgs, BootError>;

    /// Mask all interrupts. First irreversible teardown step.
    fn disable_interrupts(&mut self);

    /// Take the caches down in the order the architecture manual
    /// mandates. Nothing may fail, allocate, or touch cache-backed state
    /// after this runs.
    fn teardown_caches(&mut self);

    /// Transfer control to the OS entry point with the precomputed
    /// arguments. Never returns on real hardware; a return means the
    /// entry point came back and yields `BootError::UnreachableReturn`.
    fn jump(&mut self, entry_point: usize, args: &EntryArgs) -> Result<Infallible, BootError>;
}
