/*!
 * Core Types
 * Common types used across the memory manager
 */

/// Guest address: an unsigned offset from the arena base, never a host pointer
pub type GuestAddr = u32;

/// Byte count for guest memory operations
pub type Size = u32;

/// Raw 16-bit trap instruction word as fetched by the CPU core
pub type TrapWord = u16;

/// Guest-visible result code (Toolbox `OSErr`)
pub type OsErr = i16;

/// Guest NIL
pub const NIL: GuestAddr = 0;
