/*!
 * Memory Management
 *
 * Guest memory manager with two allocation tiers over a single arena.
 *
 * ## Pointers
 *
 * Non-relocatable blocks tracked by offset and size. Disposal is validated
 * against the pointer map, so double frees and wild frees are rejected without
 * touching the pool.
 *
 * ## Handles
 *
 * A handle is the guest offset of a master pointer. The four bytes at that
 * offset always hold the current block address, so guest code dereferences the
 * handle instead of caching the block. Master pointers are minted in blocks of
 * 128 and recycled first-in first-out.
 *
 * ## MemErr
 *
 * Every pointer and handle operation records its result code in `mem_error`
 * and mirrors it as a big-endian word at the low-memory `MemErr` cell.
 */

mod block_move;
mod handles;
mod pointers;

use handles::HandleTable;

use super::arena::Arena;
use super::config::MemoryConfig;
use super::pool::PoolAllocator;
use super::traits::BackingAllocator;
use super::types::{result_code, MemoryError, MemoryResult, MemoryStats};
use crate::core::limits::NO_ERR;
use crate::core::types::{GuestAddr, OsErr, Size};
use ahash::AHashMap;
use log::{error, info, warn};

/// Memory manager context
///
/// Owns the arena, the backing pool and all bookkeeping. Single-threaded: every
/// operation takes `&mut self` and runs to completion.
pub struct MemoryManager<A: BackingAllocator = PoolAllocator> {
    pub(super) arena: Arena,
    pub(super) config: MemoryConfig,
    pub(super) pool: A,
    // Direct-block map: offset -> requested size
    pub(super) pointers: AHashMap<GuestAddr, Size>,
    pub(super) handles: HandleTable,
    pub(super) mem_error: OsErr,
}

impl MemoryManager<PoolAllocator> {
    /// Initialize over `arena`, keeping the first `reserved` bytes out of the pool
    ///
    /// Fails only if the pool cannot be set up past the header or the first
    /// master pointer block cannot be minted. A header too small to hold
    /// `MemErr` is accepted; the cell is still mirrored at its fixed offset.
    pub fn init(arena: Arena, reserved: Size) -> MemoryResult<Self> {
        let config = MemoryConfig::new()
            .with_arena_size(arena.len())
            .with_reserved(reserved);
        if config.error_cell.saturating_add(2) > reserved {
            warn!(
                "Reserved header of {} bytes does not cover MemErr at 0x{:04x}",
                reserved, config.error_cell
            );
        }
        Self::build(arena, config, PoolAllocator::new())
    }

    /// Allocate a fresh arena sized by `config` and initialize over it
    pub fn from_config(config: &MemoryConfig) -> MemoryResult<Self> {
        Self::with_allocator(
            Arena::new(config.arena_size),
            config.clone(),
            PoolAllocator::new(),
        )
    }
}

impl<A: BackingAllocator> MemoryManager<A> {
    /// Initialize with a caller-supplied backing allocator
    ///
    /// Fails if the configuration is invalid, the allocator rejects the region
    /// past the reserved header, or the first master pointer block cannot be
    /// minted.
    pub fn with_allocator(arena: Arena, config: MemoryConfig, pool: A) -> MemoryResult<Self> {
        let config = MemoryConfig {
            arena_size: arena.len(),
            ..config
        };
        config.validate()?;
        Self::build(arena, config, pool)
    }

    fn build(arena: Arena, config: MemoryConfig, mut pool: A) -> MemoryResult<Self> {
        pool.init(
            config.reserved,
            config.arena_size.saturating_sub(config.reserved),
            config.alignment,
        )?;

        let mut manager = Self {
            handles: HandleTable::new(config.handle_batch),
            arena,
            config,
            pool,
            pointers: AHashMap::new(),
            mem_error: NO_ERR,
        };

        if let Err(e) = manager.grow_handle_table() {
            error!("Could not mint the initial master pointer block: {}", e);
            return Err(MemoryError::HandleTableInit);
        }
        manager.set_mem_error(NO_ERR);

        info!(
            "Memory manager initialized: {} byte arena, {} byte header, {}-byte alignment, {} master pointers",
            manager.config.arena_size,
            manager.config.reserved,
            manager.config.alignment,
            manager.handles.minted()
        );
        Ok(manager)
    }

    /// Most recent result code, as last written to `MemErr`
    #[inline]
    pub fn mem_error(&self) -> OsErr {
        self.mem_error
    }

    #[inline]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Guest access to the arena
    ///
    /// Writes through here bypass the manager; overwriting a master pointer
    /// breaks that handle's dereference but not the manager's bookkeeping.
    #[inline]
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    #[inline]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    #[inline]
    pub fn reserved(&self) -> Size {
        self.config.reserved
    }

    #[inline]
    pub fn pool(&self) -> &A {
        &self.pool
    }

    /// Tear down the manager and hand the arena back to the embedder
    pub fn into_arena(self) -> Arena {
        self.arena
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            arena_size: self.config.arena_size,
            reserved: self.config.reserved,
            live_pointers: self.pointers.len(),
            pointer_bytes: self.pointers.values().map(|&s| s as u64).sum(),
            live_handles: self.handles.len(),
            handle_bytes: self.handles.slots().map(|(_, s)| s.size as u64).sum(),
            free_slots: self.handles.free_len(),
            minted_slots: self.handles.minted(),
            pool_bytes_in_use: self.pool.stats().bytes_in_use,
        }
    }

    /// Record `code` as the latest result and mirror it to `MemErr`
    pub(super) fn set_mem_error(&mut self, code: OsErr) -> OsErr {
        self.mem_error = code;
        if let Err(e) = self.arena.write_word(self.config.error_cell, code as u16) {
            error!("Could not mirror MemErr: {}", e);
        }
        code
    }

    pub(super) fn report<T>(&mut self, result: MemoryResult<T>) -> MemoryResult<T> {
        self.set_mem_error(result_code(&result));
        result
    }

    /// Take a span from the pool that lies entirely past the reserved header
    pub(super) fn claim(&mut self, size: Size, clear: bool) -> MemoryResult<GuestAddr> {
        let Some(offset) = self.pool.allocate(size) else {
            error!(
                "OOM: requested {} bytes, {} bytes in use",
                size,
                self.pool.stats().bytes_in_use
            );
            return Err(MemoryError::OutOfMemory { requested: size });
        };

        if offset < self.config.reserved || !self.arena.contains(offset, size) {
            self.pool.free(offset);
            error!(
                "Pool returned span 0x{:08x} + {} outside the allocatable range",
                offset, size
            );
            return Err(MemoryError::OutOfBounds {
                address: offset,
                len: size,
            });
        }

        if clear {
            self.arena.zero(offset, size)?;
        }
        Ok(offset)
    }
}

impl<A: BackingAllocator> std::fmt::Debug for MemoryManager<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("arena", &self.arena)
            .field("reserved", &self.config.reserved)
            .field("pointers", &self.pointers.len())
            .field("handles", &self.handles.len())
            .field("free_slots", &self.handles.free_len())
            .field("mem_error", &self.mem_error)
            .finish()
    }
}
