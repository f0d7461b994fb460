/*!
 * Memory Types
 * Common types for memory management
 */

use crate::core::limits::{MEM_FULL_ERR, MEM_WZ_ERR, NO_ERR};
use crate::core::types::{GuestAddr, OsErr, Size};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes")]
    #[diagnostic(
        code(memory::out_of_memory),
        help("The pool is exhausted. Dispose of unused pointers or handles.")
    )]
    OutOfMemory { requested: Size },

    #[error("Unknown or already freed reference: 0x{0:08x}")]
    #[diagnostic(
        code(memory::unknown_reference),
        help("The offset was never allocated or has already been disposed.")
    )]
    UnknownReference(GuestAddr),

    #[error("Access outside the arena: 0x{address:08x} + {len}")]
    #[diagnostic(code(memory::out_of_bounds))]
    OutOfBounds { address: GuestAddr, len: Size },

    #[error("Invalid memory configuration: {0}")]
    #[diagnostic(code(memory::invalid_config))]
    InvalidConfig(String),

    #[error("Pool initialization failed: region 0x{region:08x}, length {length}, alignment {alignment}")]
    #[diagnostic(
        code(memory::pool_init),
        help("The region must hold at least one aligned span past the reserved header.")
    )]
    PoolInit {
        region: GuestAddr,
        length: Size,
        alignment: Size,
    },

    #[error("Could not mint the initial handle block")]
    #[diagnostic(code(memory::handle_table_init))]
    HandleTableInit,
}

impl MemoryError {
    /// Guest result code reported in D0 and `MemErr`
    pub const fn code(&self) -> OsErr {
        match self {
            MemoryError::UnknownReference(_) => MEM_WZ_ERR,
            _ => MEM_FULL_ERR,
        }
    }
}

/// Map an operation result onto the guest result code
pub fn result_code<T>(result: &MemoryResult<T>) -> OsErr {
    match result {
        Ok(_) => NO_ERR,
        Err(e) => e.code(),
    }
}

/// Master pointer contents for a handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleSlot {
    /// Offset of the relocatable block, 0 for an empty handle
    pub address: GuestAddr,
    pub size: Size,
}

impl HandleSlot {
    pub const fn new(address: GuestAddr, size: Size) -> Self {
        Self { address, size }
    }

    pub const fn is_empty(&self) -> bool {
        self.address == 0
    }
}

/// Memory statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub arena_size: Size,
    pub reserved: Size,
    pub live_pointers: usize,
    pub pointer_bytes: u64,
    pub live_handles: usize,
    pub handle_bytes: u64,
    pub free_slots: usize,
    pub minted_slots: usize,
    pub pool_bytes_in_use: u64,
}

/// Backing pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub allocations: u64,
    pub frees: u64,
    pub failed_allocations: u64,
    pub bytes_in_use: u64,
    pub free_spans: usize,
}
