/*!
 * CPU Register Access
 * The slice of the CPU core the trap adapters need
 */

/// Register file of the emulated CPU
#[cfg_attr(test, mockall::automock)]
pub trait CpuRegisters {
    /// Read address register An
    fn a_reg(&self, index: usize) -> u32;

    /// Read data register Dn
    fn d_reg(&self, index: usize) -> u32;

    /// Write address register An
    fn set_a_reg(&mut self, index: usize, value: u32);
}

/// Plain 68k register file for embedders without their own CPU state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterFile {
    pub a: [u32; 8],
    pub d: [u32; 8],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_d_reg(&mut self, index: usize, value: u32) {
        self.d[index & 7] = value;
    }
}

impl CpuRegisters for RegisterFile {
    #[inline]
    fn a_reg(&self, index: usize) -> u32 {
        self.a[index & 7]
    }

    #[inline]
    fn d_reg(&self, index: usize) -> u32 {
        self.d[index & 7]
    }

    #[inline]
    fn set_a_reg(&mut self, index: usize, value: u32) {
        self.a[index & 7] = value;
    }
}
