//! Boot error types
//!
//! Every failure the hand-off path can report happens before cache and
//! interrupt teardown begins, so all of these are recoverable: the caller
//! can report a diagnostic and try another boot source. The one exception
//! is `UnreachableReturn`, which by contract must never happen.

/// Errors reported by the boot hand-off path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// A legacy BD_T/CMDLINE tag behavior was requested that the selected
    /// architecture adapter does not provide.
    UnsupportedLegacyMode,
    /// The board pre-boot hook rejected the boot attempt.
    PrepHookFailed,
    /// The device tree blob is unusable (misaligned or empty).
    BadDeviceTree,
    /// GO or FAKE_GO was requested without a prior successful PREP.
    PhaseOrder,
    /// The legacy tag blob exceeded its fixed capacity.
    TagOverflow,
    /// Bounce scratch allocation failed; the DMA operation must not proceed.
    AllocationFailed,
    /// The OS entry point returned control after a GO transfer. Memory and
    /// cache state are no longer trustworthy; the only safe responses are
    /// hang or reset.
    UnreachableReturn,
}
