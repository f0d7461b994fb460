/*!
 * Handle Allocation
 * Relocatable blocks: NewHandle and DisposeHandle
 */

use super::super::traits::BackingAllocator;
use super::super::types::{HandleSlot, MemoryError, MemoryResult};
use super::MemoryManager;
use crate::core::limits::MASTER_POINTER_SIZE;
use crate::core::types::{GuestAddr, Size, NIL};
use ahash::AHashMap;
use log::{debug, error, info, warn};
use std::collections::VecDeque;

/// Master pointer table
///
/// A handle identity is either queued in `free` or keyed in `slots`, never both.
/// Blocks of master pointers are permanent once minted.
#[derive(Debug)]
pub(crate) struct HandleTable {
    slots: AHashMap<GuestAddr, HandleSlot>,
    free: VecDeque<GuestAddr>,
    blocks: Vec<GuestAddr>,
    batch: u32,
}

impl HandleTable {
    pub fn new(batch: u32) -> Self {
        Self {
            slots: AHashMap::new(),
            free: VecDeque::new(),
            blocks: Vec::new(),
            batch,
        }
    }

    /// Bytes needed for one block of master pointers, `None` past 4GB
    pub fn block_bytes(&self) -> Option<Size> {
        self.batch.checked_mul(MASTER_POINTER_SIZE)
    }

    /// Queue every master pointer of the block at `base`, lowest first
    pub fn mint(&mut self, base: GuestAddr) {
        self.free.extend((0..self.batch).map(|i| base + i * MASTER_POINTER_SIZE));
        self.blocks.push(base);
    }

    /// Oldest released identity
    pub fn dequeue(&mut self) -> Option<GuestAddr> {
        self.free.pop_front()
    }

    /// Queue an identity behind every other free one
    ///
    /// Also undoes a `dequeue` that did not produce a live handle, so a failed
    /// `NewHandle` moves that identity to the back of the line.
    pub fn release(&mut self, handle: GuestAddr) {
        self.free.push_back(handle);
    }

    pub fn insert(&mut self, handle: GuestAddr, slot: HandleSlot) {
        self.slots.insert(handle, slot);
    }

    pub fn remove(&mut self, handle: GuestAddr) -> Option<HandleSlot> {
        self.slots.remove(&handle)
    }

    pub fn get(&self, handle: GuestAddr) -> Option<HandleSlot> {
        self.slots.get(&handle).copied()
    }

    pub fn slots(&self) -> impl Iterator<Item = (GuestAddr, HandleSlot)> + '_ {
        self.slots.iter().map(|(&h, &s)| (h, s))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Master pointers minted so far
    #[inline]
    pub fn minted(&self) -> usize {
        self.blocks.len() * self.batch as usize
    }

    /// Base offsets of every minted block
    pub fn blocks(&self) -> &[GuestAddr] {
        &self.blocks
    }
}

impl<A: BackingAllocator> MemoryManager<A> {
    /// Allocate a relocatable block and return its handle
    ///
    /// A zero-byte request yields an empty handle whose master pointer is NIL.
    pub fn new_handle(&mut self, size: Size, clear: bool) -> MemoryResult<GuestAddr> {
        let result = self.allocate_handle(size, clear);
        self.report(result)
    }

    /// Dispose of a handle and the block it owns
    ///
    /// The master pointer cell keeps its stale value unless
    /// `clear_handle_on_dispose` is configured.
    pub fn dispose_handle(&mut self, handle: GuestAddr) -> MemoryResult<()> {
        let result = self.release_handle(handle);
        self.report(result)
    }

    /// Master pointer record for a live handle
    pub fn handle_slot(&self, handle: GuestAddr) -> Option<HandleSlot> {
        self.handles.get(handle)
    }

    /// Dereference a handle the way guest code does, by reading its master pointer
    pub fn handle_address(&self, handle: GuestAddr) -> MemoryResult<GuestAddr> {
        self.arena.read_long(handle)
    }

    #[inline]
    pub fn is_live_handle(&self, handle: GuestAddr) -> bool {
        self.handles.get(handle).is_some()
    }

    /// Base offsets of the master pointer blocks minted so far
    pub fn handle_blocks(&self) -> &[GuestAddr] {
        self.handles.blocks()
    }

    /// Mint one more block of master pointers
    pub(super) fn grow_handle_table(&mut self) -> MemoryResult<()> {
        let bytes = self
            .handles
            .block_bytes()
            .ok_or(MemoryError::OutOfMemory { requested: Size::MAX })?;
        let base = self.claim(bytes, false)?;
        self.handles.mint(base);

        info!(
            "Minted master pointer block at 0x{:08x} ({} handles total)",
            base,
            self.handles.minted()
        );
        Ok(())
    }

    fn allocate_handle(&mut self, size: Size, clear: bool) -> MemoryResult<GuestAddr> {
        if self.handles.free_len() == 0 {
            self.grow_handle_table()?;
        }
        let handle = self
            .handles
            .dequeue()
            .ok_or(MemoryError::OutOfMemory { requested: size })?;

        let address = if size > 0 {
            match self.claim(size, clear) {
                Ok(address) => address,
                Err(e) => {
                    self.handles.release(handle);
                    return Err(e);
                }
            }
        } else {
            NIL
        };

        if let Err(e) = self.arena.write_long(handle, address) {
            error!("Master pointer 0x{:08x} is not writable: {}", handle, e);
            if address != NIL {
                self.pool.free(address);
            }
            self.handles.release(handle);
            return Err(e);
        }
        self.handles.insert(handle, HandleSlot::new(address, size));

        debug!(
            "Allocated handle 0x{:08x} -> 0x{:08x} ({} bytes, clear={})",
            handle, address, size, clear
        );
        Ok(handle)
    }

    fn release_handle(&mut self, handle: GuestAddr) -> MemoryResult<()> {
        let Some(slot) = self.handles.remove(handle) else {
            warn!(
                "Attempted to dispose invalid or already freed handle: 0x{:08x}",
                handle
            );
            return Err(MemoryError::UnknownReference(handle));
        };

        if !slot.is_empty() {
            self.pool.free(slot.address);
        }
        if self.config.clear_handle_on_dispose {
            if let Err(e) = self.arena.write_long(handle, NIL) {
                error!("Could not clear master pointer 0x{:08x}: {}", handle, e);
            }
        }
        self.handles.release(handle);

        debug!(
            "Disposed handle 0x{:08x} (block 0x{:08x}, {} bytes)",
            handle, slot.address, slot.size
        );
        Ok(())
    }
}
