//! BootM_R - A memory-safe Rust implementation of the classic boot hand-off core
//!
//! This crate provides the architecture-neutral machinery a bootloader needs
//! between "image loaded in memory" and "kernel running": a staged
//! PREP -> GO state machine with strict cache/interrupt teardown ordering,
//! per-architecture entry conventions, a legacy boot-tag builder, and a
//! DMA-alignment bounce buffer.

#![no_std]
// Boot-path types have staged constructors that don't fit Default
#![allow(clippy::new_without_default)]
// Tag and register layouts use explicit bit shifts for documentation
#![allow(clippy::identity_op)]

// Standard library replacement for no_std
extern crate alloc;

// Core types
pub mod error;
pub mod images;

// Boot hand-off machinery
pub mod arch;
pub mod bootm;
pub mod hooks;
pub mod tags;

// DMA safety helper
pub mod bounce;

// Re-exports
pub use arch::{ArchAdapter, EntryArgs, EntryMode};
pub use bootm::{BootFlow, BootState};
pub use bounce::{BounceBuffer, BounceFlags, DMA_MINALIGN};
pub use error::BootError;
pub use hooks::{BoardHooks, NoopHooks};
pub use images::{BoardInfo, BootImages, FdtBlob, InitrdRange, MemBank};
