/*!
 * Core Module
 * Fundamental types and constants
 */

pub mod limits;
pub mod types;

// Re-export for convenience
pub use types::*;
