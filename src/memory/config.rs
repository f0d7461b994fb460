/*!
 * Memory Manager Configuration
 *
 * Arena layout and allocator tuning. Presets cover the common cases; individual
 * values can be overridden from the environment or loaded from a JSON file.
 */

use super::types::{MemoryError, MemoryResult};
use crate::core::limits::{
    DEFAULT_ALIGNMENT, DEFAULT_ARENA_SIZE, DEFAULT_RESERVED, HANDLE_BATCH, MASTER_POINTER_SIZE,
    MEM_ERR_CELL, MIN_ALIGNMENT,
};
use crate::core::types::{GuestAddr, Size};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Memory manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Total arena size in bytes (default: 16MB)
    pub arena_size: Size,

    /// Low-memory header excluded from allocation (default: 64KB)
    pub reserved: Size,

    /// Minimum pool alignment, power of two and at least 4 (default: 32)
    pub alignment: Size,

    /// Master pointers minted per handle block (default: 128)
    pub handle_batch: u32,

    /// Guest offset of the `MemErr` word (default: 0x0220)
    pub error_cell: GuestAddr,

    /// Zero a handle's master pointer cell when it is disposed (default: false)
    pub clear_handle_on_dispose: bool,
}

impl MemoryConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            arena_size: DEFAULT_ARENA_SIZE,
            reserved: DEFAULT_RESERVED,
            alignment: DEFAULT_ALIGNMENT,
            handle_batch: HANDLE_BATCH,
            error_cell: MEM_ERR_CELL,
            clear_handle_on_dispose: false,
        }
    }

    /// Small arena for tests and tools (256KB, 4KB header)
    pub fn minimal() -> Self {
        Self {
            arena_size: 256 * 1024,
            reserved: 0x1000,
            ..Self::new()
        }
    }

    /// Defaults overridden by `GUEST_MM_ARENA_SIZE`, `GUEST_MM_RESERVED` and
    /// `GUEST_MM_ALIGNMENT`. Values accept decimal or `0x` hex.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Some(v) = env_size("GUEST_MM_ARENA_SIZE") {
            config.arena_size = v;
        }
        if let Some(v) = env_size("GUEST_MM_RESERVED") {
            config.reserved = v;
        }
        if let Some(v) = env_size("GUEST_MM_ALIGNMENT") {
            config.alignment = v;
        }
        config
    }

    pub fn from_json_str(json: &str) -> MemoryResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MemoryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| MemoryError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn with_arena_size(mut self, arena_size: Size) -> Self {
        self.arena_size = arena_size;
        self
    }

    pub fn with_reserved(mut self, reserved: Size) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn with_alignment(mut self, alignment: Size) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_clear_on_dispose(mut self, clear: bool) -> Self {
        self.clear_handle_on_dispose = clear;
        self
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.alignment < MIN_ALIGNMENT || !self.alignment.is_power_of_two() {
            return Err(MemoryError::InvalidConfig(format!(
                "alignment {} must be a power of two >= {}",
                self.alignment, MIN_ALIGNMENT
            )));
        }
        if self.reserved >= self.arena_size {
            return Err(MemoryError::InvalidConfig(format!(
                "reserved header {} leaves no room in a {} byte arena",
                self.reserved, self.arena_size
            )));
        }
        if self.error_cell.checked_add(2).map_or(true, |end| end > self.reserved) {
            return Err(MemoryError::InvalidConfig(format!(
                "error cell 0x{:x} must lie inside the reserved header",
                self.error_cell
            )));
        }
        if self.handle_batch == 0 {
            return Err(MemoryError::InvalidConfig(
                "handle batch must mint at least one master pointer".into(),
            ));
        }
        let block_fits = self
            .handle_batch
            .checked_mul(MASTER_POINTER_SIZE)
            .is_some_and(|bytes| bytes <= self.arena_size - self.reserved);
        if !block_fits {
            return Err(MemoryError::InvalidConfig(format!(
                "handle batch {} does not fit in the {} byte pool",
                self.handle_batch,
                self.arena_size - self.reserved
            )));
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_size(key: &str) -> Option<Size> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => Size::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    match parsed {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}
