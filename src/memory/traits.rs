/*!
 * Memory Traits
 * Memory management abstractions
 */

use super::types::*;
use crate::core::types::{GuestAddr, Size};

/// Span allocator servicing raw requests inside the arena
///
/// Offsets handed out and taken back are arena-relative. Implementations keep
/// their bookkeeping out of band so guest writes cannot corrupt it.
pub trait BackingAllocator {
    /// Configure the allocator over `[region, region + length)`
    fn init(&mut self, region: GuestAddr, length: Size, alignment: Size) -> MemoryResult<()>;

    /// Allocate at least `size` bytes, returning the span offset
    fn allocate(&mut self, size: Size) -> Option<GuestAddr>;

    /// Release a span previously returned by `allocate`
    fn free(&mut self, offset: GuestAddr);

    /// Allocation statistics
    fn stats(&self) -> PoolStats {
        PoolStats::default()
    }
}

impl<A: BackingAllocator + ?Sized> BackingAllocator for Box<A> {
    fn init(&mut self, region: GuestAddr, length: Size, alignment: Size) -> MemoryResult<()> {
        (**self).init(region, length, alignment)
    }

    fn allocate(&mut self, size: Size) -> Option<GuestAddr> {
        (**self).allocate(size)
    }

    fn free(&mut self, offset: GuestAddr) {
        (**self).free(offset)
    }

    fn stats(&self) -> PoolStats {
        (**self).stats()
    }
}
