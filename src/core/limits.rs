/*!
 * System Limits and Constants
 *
 * Centralized location for arena layout, allocator tuning, trap encoding and
 * guest result codes.
 */

use super::types::{GuestAddr, OsErr, Size};

// =============================================================================
// ARENA LAYOUT
// =============================================================================

/// Default emulated address space (16MB)
pub const DEFAULT_ARENA_SIZE: Size = 16 * 1024 * 1024;

/// Default reserved header (64KB of low memory globals and vectors)
pub const DEFAULT_RESERVED: Size = 0x0001_0000;

/// Low-memory global `MemErr`
/// Receives the result of every memory manager call as a big-endian word
pub const MEM_ERR_CELL: GuestAddr = 0x0220;

// =============================================================================
// ALLOCATOR
// =============================================================================

/// Default pool alignment (32 bytes)
pub const DEFAULT_ALIGNMENT: Size = 32;

/// Smallest alignment that keeps master pointers packed
pub const MIN_ALIGNMENT: Size = 4;

/// Master pointers minted per handle block
pub const HANDLE_BATCH: u32 = 128;

/// Bytes per master pointer
pub const MASTER_POINTER_SIZE: Size = 4;

/// Small span threshold for the pool free list (4KB)
pub const SMALL_SPAN_MAX: Size = 4 * 1024;

/// Medium span threshold for the pool free list (64KB)
pub const MEDIUM_SPAN_MAX: Size = 64 * 1024;

// =============================================================================
// TRAP ENCODING
// =============================================================================

/// A-line trap prefix
pub const TRAP_PREFIX: u16 = 0xA000;

/// Mask selecting the OS trap number
pub const OS_TRAP_MASK: u16 = 0x00FF;

/// Modifier bit 9: zero the new block (`NewPtrClear`, `NewHandleClear`)
pub const TRAP_CLEAR_BIT: u16 = 1 << 9;

/// Modifier bit 10: allocate in the system heap
pub const TRAP_SYS_BIT: u16 = 1 << 10;

// =============================================================================
// RESULT CODES
// =============================================================================

/// No error
pub const NO_ERR: OsErr = 0;

/// Not enough memory in the heap
pub const MEM_FULL_ERR: OsErr = -108;

/// Attempt to operate on a free block
pub const MEM_WZ_ERR: OsErr = -111;
