/*!
 * Guest Arena
 *
 * Flat byte region standing in for the emulated address space. Every access is
 * expressed as a guest offset; multi-byte values are big-endian like the 68k.
 */

use super::types::{MemoryError, MemoryResult};
use crate::core::types::{GuestAddr, Size};
use std::ops::Range;

/// Emulated address space
#[derive(Clone)]
pub struct Arena {
    bytes: Vec<u8>,
}

impl Arena {
    /// Create a zero-filled arena of `size` bytes
    pub fn new(size: Size) -> Self {
        Self {
            bytes: vec![0u8; size as usize],
        }
    }

    /// Wrap an existing memory image
    pub fn from_vec(bytes: Vec<u8>) -> MemoryResult<Self> {
        if bytes.len() > u32::MAX as usize {
            return Err(MemoryError::InvalidConfig(format!(
                "arena of {} bytes exceeds the 32-bit guest address space",
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    #[inline]
    pub fn len(&self) -> Size {
        self.bytes.len() as Size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Whether `[address, address + len)` lies inside the arena
    #[inline]
    pub fn contains(&self, address: GuestAddr, len: Size) -> bool {
        self.range(address, len).is_ok()
    }

    fn range(&self, address: GuestAddr, len: Size) -> MemoryResult<Range<usize>> {
        let start = address as usize;
        match start.checked_add(len as usize) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(MemoryError::OutOfBounds { address, len }),
        }
    }

    pub fn slice(&self, address: GuestAddr, len: Size) -> MemoryResult<&[u8]> {
        let range = self.range(address, len)?;
        Ok(&self.bytes[range])
    }

    pub fn slice_mut(&mut self, address: GuestAddr, len: Size) -> MemoryResult<&mut [u8]> {
        let range = self.range(address, len)?;
        Ok(&mut self.bytes[range])
    }

    pub fn read_u8(&self, address: GuestAddr) -> MemoryResult<u8> {
        Ok(self.slice(address, 1)?[0])
    }

    pub fn write_u8(&mut self, address: GuestAddr, value: u8) -> MemoryResult<()> {
        self.slice_mut(address, 1)?[0] = value;
        Ok(())
    }

    pub fn read_word(&self, address: GuestAddr) -> MemoryResult<u16> {
        let bytes = self.slice(address, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn write_word(&mut self, address: GuestAddr, value: u16) -> MemoryResult<()> {
        self.slice_mut(address, 2)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn read_long(&self, address: GuestAddr) -> MemoryResult<u32> {
        let bytes = self.slice(address, 4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn write_long(&mut self, address: GuestAddr, value: u32) -> MemoryResult<()> {
        self.slice_mut(address, 4)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Zero `len` bytes at `address`
    pub fn zero(&mut self, address: GuestAddr, len: Size) -> MemoryResult<()> {
        self.slice_mut(address, len)?.fill(0);
        Ok(())
    }

    /// Region move with memmove semantics for overlapping ranges
    pub fn move_bytes(
        &mut self,
        source: GuestAddr,
        dest: GuestAddr,
        count: Size,
    ) -> MemoryResult<()> {
        let src = self.range(source, count)?;
        self.range(dest, count)?;
        self.bytes.copy_within(src, dest as usize);
        Ok(())
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena").field("len", &self.bytes.len()).finish()
    }
}
