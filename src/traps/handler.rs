/*!
 * Memory Trap Handlers
 *
 * Register-level adapters between the CPU core and the memory manager. Each
 * adapter reads its arguments from the register file, runs one manager
 * operation and returns the 16-bit result code for D0.
 *
 * Events go through `log` like the rest of the memory layer; the per-trap
 * span comes from `monitoring`.
 */

use super::cpu::CpuRegisters;
use super::types::{Trap, TrapFlags};
use crate::core::types::{TrapWord, NIL};
use crate::memory::{result_code, BackingAllocator, MemoryManager};
use crate::monitoring::span_trap;
use log::debug;

/// Trait for components that service A-line traps
pub trait TrapHandler {
    /// Handle a trap, returning the D0 result or `None` if the word is not ours
    fn handle(&mut self, cpu: &mut dyn CpuRegisters, word: TrapWord) -> Option<u16>;

    /// Get the name of this handler (for logging/debugging)
    fn name(&self) -> &'static str;
}

impl<A: BackingAllocator> TrapHandler for MemoryManager<A> {
    #[inline]
    fn handle(&mut self, cpu: &mut dyn CpuRegisters, word: TrapWord) -> Option<u16> {
        dispatch(self, cpu, word)
    }

    #[inline]
    fn name(&self) -> &'static str {
        "memory_manager"
    }
}

/// Route a trap word to its adapter
pub fn dispatch<A, C>(mm: &mut MemoryManager<A>, cpu: &mut C, word: TrapWord) -> Option<u16>
where
    A: BackingAllocator,
    C: CpuRegisters + ?Sized,
{
    let trap = Trap::decode(word)?;
    let span = span_trap(trap, word);
    let _entered = span.enter();

    let code = match trap {
        Trap::NewPtr => new_ptr(mm, cpu, word),
        Trap::DisposePtr => dispose_ptr(mm, cpu, word),
        Trap::NewHandle => new_handle(mm, cpu, word),
        Trap::DisposeHandle => dispose_handle(mm, cpu, word),
        Trap::BlockMove => block_move(mm, cpu, word),
    };

    span.record_result(code);
    Some(code)
}

/// `_NewPtr`: D0 = logical size; A0 <- new block or NIL
pub fn new_ptr<A, C>(mm: &mut MemoryManager<A>, cpu: &mut C, word: TrapWord) -> u16
where
    A: BackingAllocator,
    C: CpuRegisters + ?Sized,
{
    let flags = TrapFlags::from_word(word);
    let size = cpu.d_reg(0);
    debug!(
        "{:04x} NewPtr({:08x}) clear={} sys={}",
        word, size, flags.clear, flags.sys
    );

    let result = mm.new_ptr(size, flags.clear);
    cpu.set_a_reg(0, *result.as_ref().unwrap_or(&NIL));
    result_code(&result) as u16
}

/// `_DisposePtr`: A0 = block to dispose
pub fn dispose_ptr<A, C>(mm: &mut MemoryManager<A>, cpu: &mut C, word: TrapWord) -> u16
where
    A: BackingAllocator,
    C: CpuRegisters + ?Sized,
{
    let ptr = cpu.a_reg(0);
    debug!("{:04x} DisposePtr({:08x})", word, ptr);

    result_code(&mm.dispose_ptr(ptr)) as u16
}

/// `_NewHandle`: D0 = logical size; A0 <- new handle or NIL
pub fn new_handle<A, C>(mm: &mut MemoryManager<A>, cpu: &mut C, word: TrapWord) -> u16
where
    A: BackingAllocator,
    C: CpuRegisters + ?Sized,
{
    let flags = TrapFlags::from_word(word);
    let size = cpu.d_reg(0);
    debug!(
        "{:04x} NewHandle({:08x}) clear={} sys={}",
        word, size, flags.clear, flags.sys
    );

    let result = mm.new_handle(size, flags.clear);
    cpu.set_a_reg(0, *result.as_ref().unwrap_or(&NIL));
    result_code(&result) as u16
}

/// `_DisposeHandle`: A0 = handle to dispose
pub fn dispose_handle<A, C>(mm: &mut MemoryManager<A>, cpu: &mut C, word: TrapWord) -> u16
where
    A: BackingAllocator,
    C: CpuRegisters + ?Sized,
{
    let handle = cpu.a_reg(0);
    debug!("{:04x} DisposeHandle({:08x})", word, handle);

    result_code(&mm.dispose_handle(handle)) as u16
}

/// `_BlockMove`: A0 = source, A1 = destination, D0 = byte count
pub fn block_move<A, C>(mm: &mut MemoryManager<A>, cpu: &mut C, word: TrapWord) -> u16
where
    A: BackingAllocator,
    C: CpuRegisters + ?Sized,
{
    let source = cpu.a_reg(0);
    let dest = cpu.a_reg(1);
    let count = cpu.d_reg(0);
    debug!(
        "{:04x} BlockMove({:08x}, {:08x}, {:08x})",
        word, source, dest, count
    );

    mm.block_move_unchecked(source, dest, count) as u16
}
