/*!
 * Handle Tests
 * Master pointer mirroring, FIFO reuse and table growth
 */

use guest_mm::memory::PoolStats;
use guest_mm::{
    dispatch, Arena, BackingAllocator, CpuRegisters, GuestAddr, MemoryConfig, MemoryError,
    MemoryManager, MemoryResult, PoolAllocator, RegisterFile, Size, NIL,
};
use pretty_assertions::assert_eq;

/// Pool wrapper that counts allocate calls
#[derive(Default)]
struct CountingAllocator {
    inner: PoolAllocator,
    calls: usize,
}

impl BackingAllocator for CountingAllocator {
    fn init(&mut self, region: GuestAddr, length: Size, alignment: Size) -> MemoryResult<()> {
        self.inner.init(region, length, alignment)
    }

    fn allocate(&mut self, size: Size) -> Option<GuestAddr> {
        self.calls += 1;
        self.inner.allocate(size)
    }

    fn free(&mut self, offset: GuestAddr) {
        self.inner.free(offset)
    }

    fn stats(&self) -> PoolStats {
        self.inner.stats()
    }
}

fn counting_manager() -> MemoryManager<CountingAllocator> {
    let config = MemoryConfig::minimal();
    MemoryManager::with_allocator(
        Arena::new(config.arena_size),
        config,
        CountingAllocator::default(),
    )
    .expect("init failed")
}

#[test]
fn test_master_pointer_equals_slot_address() {
    let mut mm = MemoryManager::from_config(&MemoryConfig::minimal()).unwrap();

    for size in [1u32, 16, 100, 4096] {
        let h = mm.new_handle(size, false).unwrap();
        let slot = mm.handle_slot(h).unwrap();
        assert_eq!(slot.size, size);
        assert_eq!(mm.arena().read_long(h).unwrap(), slot.address);
    }
}

#[test]
fn test_reuse_is_fifo() {
    let mut mm = counting_manager();
    let handles: Vec<_> = (0..128)
        .map(|_| mm.new_handle(8, false).unwrap())
        .collect();
    assert_eq!(mm.stats().free_slots, 0);

    let (h1, h2) = (handles[40], handles[7]);
    mm.dispose_handle(h1).unwrap();
    mm.dispose_handle(h2).unwrap();

    assert_eq!(mm.new_handle(8, false), Ok(h1));
    assert_eq!(mm.new_handle(8, false), Ok(h2));
    assert_eq!(mm.handle_blocks().len(), 1);
}

#[test]
fn test_129th_handle_grows_table() {
    let mut mm = counting_manager();
    assert_eq!(mm.pool().calls, 1);

    for _ in 0..128 {
        mm.new_handle(8, false).unwrap();
    }
    assert_eq!(mm.pool().calls, 129);
    assert_eq!(mm.handle_blocks().len(), 1);

    let h = mm.new_handle(8, false).unwrap();
    // One call for the new master pointer block, one for the handle's block
    assert_eq!(mm.pool().calls, 131);
    assert_eq!(mm.handle_blocks().len(), 2);
    assert_eq!(h, mm.handle_blocks()[1]);
    assert_eq!(mm.stats().minted_slots, 256);
    assert_eq!(mm.stats().free_slots, 127);
}

#[test]
fn test_empty_handle_has_nil_master_pointer() {
    let mut mm = counting_manager();
    let calls = mm.pool().calls;

    let h = mm.new_handle(0, true).unwrap();
    assert_eq!(mm.handle_address(h), Ok(NIL));
    assert_eq!(mm.pool().calls, calls);
}

#[test]
fn test_dispose_unknown_handle() {
    let mut mm = counting_manager();
    let h = mm.new_handle(8, false).unwrap();

    assert!(mm.dispose_handle(h + 1).is_err());
    assert_eq!(mm.mem_error(), -111);
    assert!(mm.is_live_handle(h));

    mm.dispose_handle(h).unwrap();
    assert!(mm.dispose_handle(h).is_err());
}

#[test]
fn test_handle_stats() {
    let mut mm = counting_manager();
    let a = mm.new_handle(100, false).unwrap();
    mm.new_handle(28, false).unwrap();
    mm.new_ptr(64, false).unwrap();
    mm.dispose_handle(a).unwrap();

    let stats = mm.stats();
    assert_eq!(stats.live_handles, 1);
    assert_eq!(stats.handle_bytes, 28);
    assert_eq!(stats.live_pointers, 1);
    assert_eq!(stats.pointer_bytes, 64);
    assert_eq!(stats.free_slots, 127);
}

#[test]
fn test_growth_failure_leaves_queue_empty() {
    let mut mm = counting_manager();
    for _ in 0..128 {
        mm.new_handle(0, false).unwrap();
    }
    while mm.new_ptr(32, false).is_ok() {}
    assert_eq!(mm.stats().free_slots, 0);

    let calls = mm.pool().calls;
    assert!(matches!(
        mm.new_handle(0, false),
        Err(MemoryError::OutOfMemory { .. })
    ));
    assert_eq!(mm.mem_error(), -108);
    assert_eq!(mm.pool().calls, calls + 1);
    assert_eq!(mm.stats().free_slots, 0);
    assert_eq!(mm.stats().minted_slots, 128);
    assert_eq!(mm.handle_blocks().len(), 1);

    // Same failure through the trap path
    let mut regs = RegisterFile::new();
    regs.set_a_reg(0, 0xDEAD_BEEF);
    regs.set_d_reg(0, 16);
    assert_eq!(dispatch(&mut mm, &mut regs, 0xA122), Some(0xFF94));
    assert_eq!(regs.a_reg(0), NIL);
    assert_eq!(mm.stats().free_slots, 0);
    assert_eq!(mm.stats().live_handles, 128);
}
