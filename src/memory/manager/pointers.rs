/*!
 * Pointer Allocation
 * Non-relocatable blocks: NewPtr and DisposePtr
 */

use super::super::traits::BackingAllocator;
use super::super::types::{MemoryError, MemoryResult};
use super::MemoryManager;
use crate::core::types::{GuestAddr, Size, NIL};
use log::{debug, warn};

impl<A: BackingAllocator> MemoryManager<A> {
    /// Allocate a non-relocatable block of `size` bytes
    ///
    /// A zero-byte request succeeds with NIL and records nothing.
    pub fn new_ptr(&mut self, size: Size, clear: bool) -> MemoryResult<GuestAddr> {
        let result = self.allocate_pointer(size, clear);
        self.report(result)
    }

    /// Dispose of a block returned by `new_ptr`
    pub fn dispose_ptr(&mut self, ptr: GuestAddr) -> MemoryResult<()> {
        let result = self.release_pointer(ptr);
        self.report(result)
    }

    /// Requested size of a live pointer block
    pub fn pointer_size(&self, ptr: GuestAddr) -> Option<Size> {
        self.pointers.get(&ptr).copied()
    }

    #[inline]
    pub fn is_live_pointer(&self, ptr: GuestAddr) -> bool {
        self.pointers.contains_key(&ptr)
    }

    fn allocate_pointer(&mut self, size: Size, clear: bool) -> MemoryResult<GuestAddr> {
        if size == 0 {
            return Ok(NIL);
        }

        let ptr = self.claim(size, clear)?;
        self.pointers.insert(ptr, size);

        debug!("Allocated pointer 0x{:08x} ({} bytes, clear={})", ptr, size, clear);
        Ok(ptr)
    }

    fn release_pointer(&mut self, ptr: GuestAddr) -> MemoryResult<()> {
        let Some(size) = self.pointers.remove(&ptr) else {
            warn!(
                "Attempted to dispose invalid or already freed pointer: 0x{:08x}",
                ptr
            );
            return Err(MemoryError::UnknownReference(ptr));
        };

        self.pool.free(ptr);
        debug!("Disposed pointer 0x{:08x} ({} bytes)", ptr, size);
        Ok(())
    }
}
