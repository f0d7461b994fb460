/*!
 * Memory Module
 * Guest memory management and allocation
 */

pub mod arena;
pub mod config;
pub mod manager;
pub mod pool;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use arena::Arena;
pub use config::MemoryConfig;
pub use manager::MemoryManager;
pub use pool::PoolAllocator;
pub use traits::*;
pub use types::*;
