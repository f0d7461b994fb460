/*!
 * Block Move
 * Raw byte mover behind the BlockMove trap
 */

use super::super::traits::BackingAllocator;
use super::MemoryManager;
use crate::core::limits::NO_ERR;
use crate::core::types::{GuestAddr, OsErr, Size};
use log::warn;

impl<A: BackingAllocator> MemoryManager<A> {
    /// Copy `count` bytes from `source` to `dest` with memmove semantics
    ///
    /// Not checked against the pointer map or the handle table and updates no
    /// bookkeeping, so guest code may move bytes into the header or across
    /// block boundaries. Always reports `noErr` and leaves `MemErr` untouched.
    /// A range that runs past the end of the arena copies nothing.
    pub fn block_move_unchecked(
        &mut self,
        source: GuestAddr,
        dest: GuestAddr,
        count: Size,
    ) -> OsErr {
        if count == 0 || source == dest {
            return NO_ERR;
        }
        if let Err(e) = self.arena.move_bytes(source, dest, count) {
            warn!(
                "BlockMove 0x{:08x} -> 0x{:08x} ({} bytes) ignored: {}",
                source, dest, count, e
            );
        }
        NO_ERR
    }
}
