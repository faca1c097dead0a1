//! Board hook points
//!
//! Boards customize the hand-off through an injected trait instead of
//! link-time symbol overrides, so the core stays testable and a board with
//! nothing to do pays nothing. Default bodies are no-ops.

use crate::error::BootError;
use crate::images::BootImages;

/// Board-level participation in the boot sequence.
pub trait BoardHooks {
    /// Called during PREP, after architecture image setup. A board may
    /// veto the attempt here; nothing irreversible has happened yet.
    fn prep_linux(&mut self, _images: &BootImages) -> Result<(), BootError> {
        Ok(())
    }

    /// Called during teardown, after interrupts are masked and before the
    /// caches go down. Must not fail, allocate, or touch cache-backed
    /// state the cache-disable sequence is about to invalidate.
    fn cleanup_before_linux(&mut self) {}
}

/// Hooks for boards with nothing to do.
pub struct NoopHooks;

impl BoardHooks for NoopHooks {}
