//! DMA bounce buffer
//!
//! Guarantees that a buffer handed to a DMA-capable controller meets the
//! platform's minimum alignment for both start address and length,
//! transparently substituting an aligned scratch copy when it does not.
//! The caller never pre-allocates aligned memory; aligned inputs take a
//! zero-cost fast path with no allocation at all.

use alloc::alloc::{alloc_zeroed, dealloc, Layout};
use core::ptr::NonNull;

use bitflags::bitflags;
use log::debug;

use crate::error::BootError;

/// Minimum DMA alignment assumed for the platform (one cache line).
pub const DMA_MINALIGN: usize = 64;

bitflags! {
    /// Transfer directions a bounce must honor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BounceFlags: u32 {
        /// The controller reads the buffer: pre-existing contents are
        /// copied into the scratch buffer at `start`.
        const READ = 1 << 0;
        /// The controller writes the buffer: scratch contents are copied
        /// back to the caller's buffer at `stop`.
        const WRITE = 1 << 1;
    }
}

/// Owned aligned scratch allocation.
struct Scratch {
    ptr: NonNull<u8>,
    layout: Layout,
}

/// Scoped alignment wrapper around a caller buffer.
///
/// Created immediately before a DMA operation and released immediately
/// after; the scratch allocation never escapes the guard. After `stop` (or
/// `Drop`) the caller's slice holds exactly what the flags dictate and is
/// usable again, whichever path was taken.
pub struct BounceBuffer<'a> {
    user: &'a mut [u8],
    scratch: Option<Scratch>,
    flags: BounceFlags,
}

impl<'a> BounceBuffer<'a> {
    /// Wrap `data` using the platform minimum DMA alignment.
    pub fn start(data: &'a mut [u8], flags: BounceFlags) -> Result<Self, BootError> {
        Self::start_aligned(data, DMA_MINALIGN, flags)
    }

    /// Wrap `data` for a controller that requires `align`-byte alignment
    /// of both start address and length. `align` must be a power of two.
    pub fn start_aligned(
        data: &'a mut [u8],
        align: usize,
        flags: BounceFlags,
    ) -> Result<Self, BootError> {
        debug_assert!(align.is_power_of_two());

        let addr = data.as_ptr() as usize;
        if data.is_empty() || (addr % align == 0 && data.len() % align == 0) {
            // Fast path: the caller's buffer already satisfies the
            // controller, nothing to allocate.
            return Ok(BounceBuffer {
                user: data,
                scratch: None,
                flags,
            });
        }

        let rounded = align_up(data.len(), align);
        let layout =
            Layout::from_size_align(rounded, align).map_err(|_| BootError::AllocationFailed)?;
        // Zero-filled scratch: the working slice is initialized memory
        // even without READ, and the rounded-up padding the controller
        // transfers never carries stale heap bytes.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(BootError::AllocationFailed)?;

        if flags.contains(BounceFlags::READ) {
            unsafe {
                core::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len());
            }
        }
        debug!(
            "bounce: {:#x}/{} -> {:#x}/{}",
            addr,
            data.len(),
            ptr.as_ptr() as usize,
            rounded
        );

        Ok(BounceBuffer {
            user: data,
            scratch: Some(Scratch { ptr, layout }),
            flags,
        })
    }

    /// Whether an aligned scratch copy was substituted.
    pub fn is_bounced(&self) -> bool {
        self.scratch.is_some()
    }

    /// Working buffer contents, caller-visible length.
    pub fn as_slice(&self) -> &[u8] {
        match &self.scratch {
            Some(s) => unsafe { core::slice::from_raw_parts(s.ptr.as_ptr(), self.user.len()) },
            None => self.user,
        }
    }

    /// Mutable view of the working buffer, caller-visible length.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &self.scratch {
            Some(s) => unsafe {
                core::slice::from_raw_parts_mut(s.ptr.as_ptr(), self.user.len())
            },
            None => self.user,
        }
    }

    /// Address to program into the DMA engine. Aligned whenever a bounce
    /// was needed.
    pub fn dma_addr(&self) -> usize {
        self.as_slice().as_ptr() as usize
    }

    /// Length to program into the DMA engine: the caller length rounded up
    /// to the alignment when bounced, the caller length otherwise.
    pub fn dma_len(&self) -> usize {
        match &self.scratch {
            Some(s) => s.layout.size(),
            None => self.user.len(),
        }
    }

    /// Finish the scoped transfer: copy scratch contents back under
    /// `WRITE` and release the scratch. Dropping the guard has the same
    /// effect; `stop` exists for call-site symmetry with `start`.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for BounceBuffer<'_> {
    fn drop(&mut self) {
        if let Some(s) = self.scratch.take() {
            if self.flags.contains(BounceFlags::WRITE) {
                unsafe {
                    core::ptr::copy_nonoverlapping(
                        s.ptr.as_ptr(),
                        self.user.as_mut_ptr(),
                        self.user.len(),
                    );
                }
            }
            unsafe {
                dealloc(s.ptr.as_ptr(), s.layout);
            }
        }
    }
}

/// Round `n` up to a multiple of `align` (power of two).
fn align_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cache-line aligned backing store so tests control the fast path.
    #[repr(align(64))]
    struct Aligned([u8; 256]);

    #[test]
    fn test_aligned_fast_path() {
        let mut backing = Aligned([0xAA; 256]);
        let addr = backing.0.as_ptr() as usize;

        let bb = BounceBuffer::start(&mut backing.0[..128], BounceFlags::READ).unwrap();
        assert!(!bb.is_bounced());
        assert_eq!(bb.dma_addr(), addr);
        assert_eq!(bb.dma_len(), 128);
        bb.stop();

        assert!(backing.0.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_misaligned_start_bounces() {
        let mut backing = Aligned([0; 256]);
        let bb = BounceBuffer::start(&mut backing.0[1..65], BounceFlags::empty()).unwrap();
        assert!(bb.is_bounced());
        assert_eq!(bb.dma_addr() % DMA_MINALIGN, 0);
        assert_eq!(bb.dma_len() % DMA_MINALIGN, 0);
        bb.stop();
    }

    #[test]
    fn test_misaligned_length_bounces() {
        let mut backing = Aligned([0; 256]);
        // Start address aligned, length is not.
        let bb = BounceBuffer::start(&mut backing.0[..100], BounceFlags::empty()).unwrap();
        assert!(bb.is_bounced());
        assert_eq!(bb.dma_len(), 128);
        bb.stop();
    }

    #[test]
    fn test_round_trip_read_write() {
        let mut backing = Aligned([0; 256]);
        for (i, b) in backing.0.iter_mut().enumerate() {
            *b = i as u8;
        }
        let before: [u8; 100] = backing.0[1..101].try_into().unwrap();

        let mut bb = BounceBuffer::start(
            &mut backing.0[1..101],
            BounceFlags::READ | BounceFlags::WRITE,
        )
        .unwrap();
        assert!(bb.is_bounced());
        // READ preserved the original contents in the working copy.
        assert_eq!(bb.as_slice(), &before[..]);

        // Simulate the controller rewriting the buffer.
        for b in bb.as_mut_slice() {
            *b = b.wrapping_add(1);
        }
        bb.stop();

        // The caller's buffer holds the mutated bytes, not the originals.
        for (i, &b) in backing.0[1..101].iter().enumerate() {
            assert_eq!(b, before[i].wrapping_add(1));
        }
        // Bytes outside the wrapped window are untouched.
        assert_eq!(backing.0[0], 0);
        assert_eq!(backing.0[101], 101);
    }

    #[test]
    fn test_fast_path_start_stop_is_identity() {
        let mut backing = Aligned([0x5C; 256]);
        let bb = BounceBuffer::start(
            &mut backing.0[..64],
            BounceFlags::READ | BounceFlags::WRITE,
        )
        .unwrap();
        assert!(!bb.is_bounced());
        bb.stop();
        assert!(backing.0.iter().all(|&b| b == 0x5C));
    }

    #[test]
    fn test_drop_behaves_like_stop() {
        let mut backing = Aligned([0; 256]);
        {
            let mut bb =
                BounceBuffer::start(&mut backing.0[1..33], BounceFlags::WRITE).unwrap();
            bb.as_mut_slice().fill(0x42);
            // No explicit stop: the guard goes out of scope here.
        }
        assert!(backing.0[1..33].iter().all(|&b| b == 0x42));
        assert_eq!(backing.0[0], 0);
        assert_eq!(backing.0[33], 0);
    }

    #[test]
    fn test_scratch_is_zeroed_without_read() {
        let mut backing = Aligned([0xEE; 256]);
        let bb = BounceBuffer::start(&mut backing.0[1..65], BounceFlags::empty()).unwrap();
        assert!(bb.is_bounced());
        // No READ: the working buffer starts as zeroed scratch, never as
        // whatever the allocator handed back.
        assert!(bb.as_slice().iter().all(|&b| b == 0));
        bb.stop();
    }

    #[test]
    fn test_padding_tail_is_zeroed_with_read() {
        let mut backing = Aligned([0xEE; 256]);
        let bb = BounceBuffer::start(&mut backing.0[1..101], BounceFlags::READ).unwrap();
        assert!(bb.is_bounced());
        // The controller sees dma_len() bytes: the caller's data followed
        // by zero padding, nothing else.
        let dma = unsafe { core::slice::from_raw_parts(bb.dma_addr() as *const u8, bb.dma_len()) };
        assert!(dma[..100].iter().all(|&b| b == 0xEE));
        assert!(dma[100..].iter().all(|&b| b == 0));
        bb.stop();
    }

    #[test]
    fn test_empty_buffer_fast_path() {
        let mut empty: [u8; 0] = [];
        let bb = BounceBuffer::start(&mut empty, BounceFlags::READ).unwrap();
        assert!(!bb.is_bounced());
        assert_eq!(bb.dma_len(), 0);
        bb.stop();
    }
}
