//! Image boot state machine
//!
//! Sequences one boot attempt through PREP -> GO (or FAKE_GO). PREP runs
//! the architecture image-setup and board pre-boot hooks and is fully
//! recoverable. GO computes the entry arguments, then performs the
//! irreversible teardown — interrupts off, board cleanup, caches down, in
//! that order — and jumps to the loaded image; it never returns on
//! success. FAKE_GO performs every GO side effect except the jump, for
//! boot-path tracing.
//!
//! No fallible operation runs once teardown has begun: the entry
//! arguments (including the legacy tag blob, which may fail to build) are
//! computed first, and everything after the interrupt mask is infallible
//! by construction.

use core::convert::Infallible;

use bitflags::bitflags;
use log::{debug, info, warn};

use crate::arch::{ArchAdapter, EntryArgs};
use crate::error::BootError;
use crate::hooks::BoardHooks;
use crate::images::BootImages;

bitflags! {
    /// Requested boot phases and legacy capability bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BootState: u32 {
        /// Image setup and board pre-boot hooks. Recoverable on failure.
        const PREP = 1 << 0;
        /// Teardown and control transfer. Does not return on success.
        const GO = 1 << 1;
        /// Every GO side effect except the jump; returns to the caller.
        const FAKE_GO = 1 << 2;
        /// Legacy board-info tag parameter passing.
        const BD_T = 1 << 3;
        /// Legacy command-line tag parameter passing.
        const CMDLINE = 1 << 4;
    }
}

impl BootState {
    /// The capability-request subset of a mask.
    pub fn legacy_bits(self) -> BootState {
        self & (BootState::BD_T | BootState::CMDLINE)
    }
}

/// The staged hand-off to a loaded OS image.
///
/// One instance covers one boot attempt. The images are read-only for the
/// attempt's duration; the adapter and hooks are owned so nothing on the
/// GO path reaches for shared state.
pub struct BootFlow<'a, A: ArchAdapter, H: BoardHooks> {
    images: &'a BootImages<'a>,
    arch: A,
    hooks: H,
    prep_done: bool,
}

impl<'a, A: ArchAdapter, H: BoardHooks> BootFlow<'a, A, H> {
    pub fn new(images: &'a BootImages<'a>, arch: A, hooks: H) -> Self {
        BootFlow {
            images,
            arch,
            hooks,
            prep_done: false,
        }
    }

    /// The adapter, for post-FAKE_GO diagnostics.
    pub fn arch(&self) -> &A {
        &self.arch
    }

    /// Dispatch the requested phases of one boot attempt.
    ///
    /// Legacy capability bits are validated against the adapter before
    /// anything runs, so an unsupported request has no side effects at
    /// all. A successful GO does not return.
    pub fn run(&mut self, state: BootState) -> Result<(), BootError> {
        let legacy = state.legacy_bits();
        if !self.arch.legacy_caps().contains(legacy) {
            warn!("bootm: unsupported legacy mode requested: {:?}", legacy);
            return Err(BootError::UnsupportedLegacyMode);
        }
        if state.contains(BootState::PREP) {
            self.prep()?;
        }
        if state.contains(BootState::FAKE_GO) {
            self.fake_go()?;
        } else if state.contains(BootState::GO) {
            let _ = self.go()?;
        }
        Ok(())
    }

    /// PREP: architecture image setup (when a device tree is configured),
    /// then the board pre-boot hook. Nothing irreversible happens here;
    /// on failure the attempt can simply be retried with another image.
    pub fn prep(&mut self) -> Result<(), BootError> {
        debug!("bootm: prep, entry {:#x}", self.images.entry_point);
        if self.images.has_fdt() {
            self.arch.image_setup(self.images)?;
        }
        self.hooks.prep_linux(self.images)?;
        self.prep_done = true;
        Ok(())
    }

    /// GO: compute entry arguments, tear down, jump. Does not return on
    /// success. An `UnreachableReturn` error means the entry point came
    /// back; memory and caches are no longer trustworthy and the caller
    /// must hang or reset.
    pub fn go(&mut self) -> Result<Infallible, BootError> {
        let args = self.pre_jump()?;
        self.arch.jump(self.images.entry_point, &args)
    }

    /// FAKE_GO: every GO side effect except the jump. Returns the entry
    /// arguments that a real GO would have handed to the kernel.
    pub fn fake_go(&mut self) -> Result<EntryArgs, BootError> {
        let args = self.pre_jump()?;
        info!(
            "bootm: fake go complete, would enter {:#x} with {:?}",
            self.images.entry_point, args
        );
        Ok(args)
    }

    /// Shared GO/FAKE_GO front half: ordering guard, argument
    /// computation, and the irreversible teardown.
    fn pre_jump(&mut self) -> Result<EntryArgs, BootError> {
        if !self.prep_done {
            return Err(BootError::PhaseOrder);
        }
        // Still fallible: the legacy tag blob is built here.
        let args = self.arch.compute_entry_args(self.images)?;

        // Point of no return. Strict order; nothing below may fail or
        // allocate.
        self.arch.disable_interrupts();
        self.hooks.cleanup_before_linux();
        self.arch.teardown_caches();
        Ok(args)
    }
}
