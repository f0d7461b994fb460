/*!
 * Trap Types
 * Decoding of A-line trap words for the memory manager
 */

use crate::core::limits::{OS_TRAP_MASK, TRAP_CLEAR_BIT, TRAP_PREFIX, TRAP_SYS_BIT};
use crate::core::types::TrapWord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory manager traps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trap {
    /// `_NewPtr` (A11E): D0 = size, A0 <- pointer
    NewPtr,
    /// `_DisposePtr` (A01F): A0 = pointer
    DisposePtr,
    /// `_NewHandle` (A122): D0 = size, A0 <- handle
    NewHandle,
    /// `_DisposeHandle` (A023): A0 = handle
    DisposeHandle,
    /// `_BlockMove` (A02E): A0 = source, A1 = dest, D0 = count
    BlockMove,
}

impl Trap {
    /// Decode an OS trap word, ignoring modifier bits
    pub fn decode(word: TrapWord) -> Option<Self> {
        // Toolbox traps set bit 11
        if word & 0xF800 != TRAP_PREFIX {
            return None;
        }
        match word & OS_TRAP_MASK {
            0x1E => Some(Trap::NewPtr),
            0x1F => Some(Trap::DisposePtr),
            0x22 => Some(Trap::NewHandle),
            0x23 => Some(Trap::DisposeHandle),
            0x2E => Some(Trap::BlockMove),
            _ => None,
        }
    }

    /// Canonical trap word without modifiers
    pub const fn word(self) -> TrapWord {
        match self {
            Trap::NewPtr => 0xA11E,
            Trap::DisposePtr => 0xA01F,
            Trap::NewHandle => 0xA122,
            Trap::DisposeHandle => 0xA023,
            Trap::BlockMove => 0xA02E,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Trap::NewPtr => "NewPtr",
            Trap::DisposePtr => "DisposePtr",
            Trap::NewHandle => "NewHandle",
            Trap::DisposeHandle => "DisposeHandle",
            Trap::BlockMove => "BlockMove",
        }
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Modifier bits carried in the trap word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapFlags {
    /// Zero the new block
    pub clear: bool,
    /// System heap request; there is a single heap, so this only shows up in logs
    pub sys: bool,
}

impl TrapFlags {
    pub const fn from_word(word: TrapWord) -> Self {
        Self {
            clear: word & TRAP_CLEAR_BIT != 0,
            sys: word & TRAP_SYS_BIT != 0,
        }
    }
}
