/*!
 * Guest Memory Manager Library
 * Pointer and handle allocation inside an emulated 68k address space
 *
 * The embedder owns a flat big-endian arena, reserves a low-memory header and
 * hands everything above it to the manager. Guest code reaches the manager
 * through A-line traps (`NewPtr`, `DisposePtr`, `NewHandle`, `DisposeHandle`,
 * `BlockMove`); the result of every allocation call is mirrored into the
 * `MemErr` low-memory cell.
 */

pub mod core;
pub mod memory;
pub mod monitoring;
pub mod traps;

// Re-exports
pub use crate::core::types::{GuestAddr, OsErr, Size, TrapWord, NIL};
pub use memory::{
    Arena, BackingAllocator, HandleSlot, MemoryConfig, MemoryError, MemoryManager,
    MemoryResult, MemoryStats, PoolAllocator,
};
pub use monitoring::init_tracing;
pub use traps::{dispatch, CpuRegisters, RegisterFile, Trap, TrapFlags, TrapHandler};
