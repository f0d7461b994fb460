/*!
 * Trap Dispatch
 * A-line trap adapters exposing the memory manager to guest code
 */

pub mod cpu;
pub mod handler;
pub mod types;

// Re-export for convenience
pub use cpu::{CpuRegisters, RegisterFile};
pub use handler::{
    block_move, dispatch, dispose_handle, dispose_ptr, new_handle, new_ptr, TrapHandler,
};
pub use types::{Trap, TrapFlags};
