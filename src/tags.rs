//! Legacy boot-tag list builder
//!
//! When no device tree is available, the kernel learns about the machine
//! from a fixed-layout sequence of tag records placed in memory: a CORE
//! header, one MEM record per bank, optional INITRD2/SERIAL/REVISION
//! records, the command line, and a NONE terminator. Each record is a
//! word-sized header `{ size_in_words, tag_id }` followed by its payload.
//!
//! The list is built into a fixed-capacity word buffer so construction on
//! the boot path never allocates. The blob is a 32-bit format; addresses
//! and sizes are truncated to 32 bits by definition.

use heapless::Vec;

use crate::error::BootError;
use crate::images::{InitrdRange, MemBank};

/// Tag identifiers, as consumed by legacy kernels.
pub const ATAG_NONE: u32 = 0x0000_0000;
pub const ATAG_CORE: u32 = 0x5441_0001;
pub const ATAG_MEM: u32 = 0x5441_0002;
pub const ATAG_SERIAL: u32 = 0x5441_0006;
pub const ATAG_REVISION: u32 = 0x5441_0007;
pub const ATAG_CMDLINE: u32 = 0x5441_0009;
pub const ATAG_INITRD2: u32 = 0x5442_0005;

/// Capacity of the tag blob, in 32-bit words.
pub const TAG_LIST_WORDS: usize = 256;

/// Word-level builder for the legacy parameter blob.
///
/// Records must be added in the order the kernel expects: `add_core`
/// first, `finish` last. The blob address stays stable for the lifetime
/// of the builder, so it can be computed before teardown and handed to
/// the kernel afterwards.
#[derive(Debug)]
pub struct TagList {
    words: Vec<u32, TAG_LIST_WORDS>,
}

impl TagList {
    /// Empty list; call `add_core` before any other record.
    pub fn new() -> Self {
        TagList { words: Vec::new() }
    }

    /// Mandatory CORE header. Zero flags/pagesize/rootdev keep the kernel
    /// defaults.
    pub fn add_core(&mut self) -> Result<(), BootError> {
        self.header(5, ATAG_CORE)?;
        self.word(0)?; // flags
        self.word(0)?; // pagesize
        self.word(0) // rootdev
    }

    /// One MEM record describing a physical bank.
    pub fn add_mem(&mut self, bank: MemBank) -> Result<(), BootError> {
        self.header(4, ATAG_MEM)?;
        self.word(bank.size as u32)?;
        self.word(bank.start as u32)
    }

    /// INITRD2 record for a preloaded ramdisk.
    pub fn add_initrd(&mut self, initrd: InitrdRange) -> Result<(), BootError> {
        self.header(4, ATAG_INITRD2)?;
        self.word(initrd.start as u32)?;
        self.word(initrd.len() as u32)
    }

    /// SERIAL record carrying a 64-bit board serial number.
    pub fn add_serial(&mut self, serial: u64) -> Result<(), BootError> {
        self.header(4, ATAG_SERIAL)?;
        self.word(serial as u32)?;
        self.word((serial >> 32) as u32)
    }

    /// REVISION record carrying the board revision word.
    pub fn add_revision(&mut self, revision: u32) -> Result<(), BootError> {
        self.header(3, ATAG_REVISION)?;
        self.word(revision)
    }

    /// CMDLINE record: NUL-terminated string, padded to a word boundary.
    pub fn add_cmdline(&mut self, cmdline: &str) -> Result<(), BootError> {
        let bytes = cmdline.as_bytes();
        // Payload words cover the string plus its NUL terminator.
        let payload_words = (bytes.len() + 1).div_ceil(4);
        self.header(2 + payload_words as u32, ATAG_CMDLINE)?;

        let mut word = 0u32;
        let mut shift = 0;
        for &b in bytes {
            word |= (b as u32) << shift;
            shift += 8;
            if shift == 32 {
                self.word(word)?;
                word = 0;
                shift = 0;
            }
        }
        // Final word carries the NUL terminator and zero padding.
        self.word(word)
    }

    /// NONE terminator. The list is complete after this.
    pub fn finish(&mut self) -> Result<(), BootError> {
        // The terminator is the one record with a zero size field.
        self.word(0)?;
        self.word(ATAG_NONE)
    }

    /// Address of the blob, as handed to the kernel.
    pub fn addr(&self) -> usize {
        self.words.as_ptr() as usize
    }

    /// The blob as words, for inspection.
    pub fn as_words(&self) -> &[u32] {
        &self.words
    }

    fn header(&mut self, size_words: u32, tag: u32) -> Result<(), BootError> {
        self.word(size_words)?;
        self.word(tag)
    }

    fn word(&mut self, w: u32) -> Result<(), BootError> {
        self.words.push(w).map_err(|_| BootError::TagOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    /// Recover the CMDLINE payload string from a finished blob.
    fn find_cmdline(words: &[u32]) -> Option<String> {
        let mut i = 0;
        while i + 1 < words.len() {
            let size = words[i] as usize;
            let tag = words[i + 1];
            if tag == ATAG_NONE {
                return None;
            }
            if tag == ATAG_CMDLINE {
                let payload = &words[i + 2..i + size];
                let mut bytes: Vec<u8> = Vec::new();
                for w in payload {
                    bytes.extend_from_slice(&w.to_le_bytes());
                }
                let nul = bytes.iter().position(|&b| b == 0)?;
                return Some(String::from_utf8_lossy(&bytes[..nul]).into_owned());
            }
            i += size;
        }
        None
    }

    fn full_list() -> TagList {
        let mut tags = TagList::new();
        tags.add_core().unwrap();
        tags.add_mem(MemBank {
            start: 0x4000_0000,
            size: 0x1000_0000,
        })
        .unwrap();
        tags.add_initrd(InitrdRange {
            start: 0x800_0000,
            end: 0x810_0000,
        })
        .unwrap();
        tags.add_serial(0x0123_4567_89ab_cdef).unwrap();
        tags.add_revision(0x2).unwrap();
        tags.add_cmdline("console=ttyS0").unwrap();
        tags.finish().unwrap();
        tags
    }

    #[test]
    fn test_core_header_first() {
        let tags = full_list();
        let words = tags.as_words();
        assert_eq!(words[0], 5);
        assert_eq!(words[1], ATAG_CORE);
        assert_eq!(&words[2..5], &[0, 0, 0]);
    }

    #[test]
    fn test_none_terminator_last() {
        let tags = full_list();
        let words = tags.as_words();
        let n = words.len();
        assert_eq!(words[n - 2], 0);
        assert_eq!(words[n - 1], ATAG_NONE);
    }

    #[test]
    fn test_mem_record_layout() {
        let tags = full_list();
        let words = tags.as_words();
        // MEM follows the 5-word CORE record: {4, ATAG_MEM, size, start}.
        assert_eq!(words[5], 4);
        assert_eq!(words[6], ATAG_MEM);
        assert_eq!(words[7], 0x1000_0000);
        assert_eq!(words[8], 0x4000_0000);
    }

    #[test]
    fn test_cmdline_round_trips() {
        let tags = full_list();
        assert_eq!(
            find_cmdline(tags.as_words()).as_deref(),
            Some("console=ttyS0")
        );
    }

    #[test]
    fn test_cmdline_word_padding() {
        // 4-byte string: the NUL terminator needs a whole extra word.
        let mut tags = TagList::new();
        tags.add_core().unwrap();
        tags.add_cmdline("root").unwrap();
        let words = tags.as_words();
        assert_eq!(words[5], 4); // 2 header + 2 payload words
        assert_eq!(words[6], ATAG_CMDLINE);
        assert_eq!(words[7], u32::from_le_bytes(*b"root"));
        assert_eq!(words[8], 0);
    }

    #[test]
    fn test_capacity_overflow() {
        let long: String = core::iter::repeat('x').take(4 * TAG_LIST_WORDS).collect();
        let mut tags = TagList::new();
        tags.add_core().unwrap();
        assert_eq!(tags.add_cmdline(&long), Err(BootError::TagOverflow));
    }

    #[test]
    fn test_blob_addr_is_stable() {
        let tags = full_list();
        assert_eq!(tags.addr(), tags.as_words().as_ptr() as usize);
    }
}
