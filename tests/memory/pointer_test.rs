/*!
 * Pointer Tests
 * NewPtr / DisposePtr behavior through the public manager API
 */

use guest_mm::core::limits::{MEM_ERR_CELL, MEM_WZ_ERR, NO_ERR};
use guest_mm::{Arena, BackingAllocator, MemoryError, MemoryManager, NIL};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashSet;

const ARENA: u32 = 512 * 1024;
const RESERVED: u32 = 0x4000;

fn manager() -> MemoryManager {
    MemoryManager::init(Arena::new(ARENA), RESERVED).expect("init failed")
}

#[test]
fn test_zero_size_returns_nil() {
    let mut mm = manager();
    let live = mm.stats().live_pointers;

    assert_eq!(mm.new_ptr(0, false), Ok(NIL));
    assert_eq!(mm.mem_error(), NO_ERR);
    assert_eq!(mm.stats().live_pointers, live);

    // No record was created, so NIL is not disposable
    assert_eq!(mm.dispose_ptr(NIL), Err(MemoryError::UnknownReference(NIL)));
    assert_eq!(mm.mem_error(), MEM_WZ_ERR);
}

#[test]
fn test_offsets_are_distinct_and_in_range() {
    let mut mm = manager();
    let mut seen = HashSet::new();

    for i in 1..200u32 {
        let size = (i * 37) % 500 + 1;
        let ptr = mm.new_ptr(size, false).expect("allocation failed");
        assert!(ptr >= RESERVED, "0x{:x} lies in the header", ptr);
        assert!(ptr + size <= ARENA, "0x{:x} + {} runs off the arena", ptr, size);
        assert!(seen.insert(ptr), "0x{:x} returned twice", ptr);
        assert_eq!(mm.pointer_size(ptr), Some(size));
    }
}

#[test]
fn test_clear_zeroes_recycled_bytes() {
    let mut mm = manager();
    let dirty = mm.new_ptr(256, false).unwrap();
    mm.arena_mut().slice_mut(dirty, 256).unwrap().fill(0xAB);
    mm.dispose_ptr(dirty).unwrap();

    let ptr = mm.new_ptr(256, true).unwrap();
    assert_eq!(ptr, dirty);
    assert!(mm.arena().slice(ptr, 256).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn test_double_dispose_fails() {
    let mut mm = manager();
    let ptr = mm.new_ptr(40, false).unwrap();

    assert_eq!(mm.dispose_ptr(ptr), Ok(()));
    assert_eq!(mm.mem_error(), NO_ERR);
    assert_eq!(mm.dispose_ptr(ptr), Err(MemoryError::UnknownReference(ptr)));
    assert_eq!(mm.mem_error(), MEM_WZ_ERR);
    assert_eq!(mm.arena().read_word(MEM_ERR_CELL).unwrap(), 0xFF91);
}

#[test]
fn test_wild_dispose_leaves_pool_alone() {
    let mut mm = manager();
    let ptr = mm.new_ptr(64, false).unwrap();
    let frees = mm.pool().stats().frees;

    // Interior offset of a live block
    assert!(mm.dispose_ptr(ptr + 8).is_err());
    assert_eq!(mm.pool().stats().frees, frees);
    assert!(mm.is_live_pointer(ptr));
}

#[test]
fn test_allocate_free_allocate() {
    let mut mm = manager();
    let p = mm.new_ptr(64, false).unwrap();
    assert_eq!(mm.dispose_ptr(p), Ok(()));

    let q = mm.new_ptr(64, false).unwrap();
    assert!(q >= RESERVED);
    assert_eq!(mm.mem_error(), NO_ERR);
}

#[test]
fn test_exhaustion_reports_mem_full() {
    let mut mm = manager();
    let err = mm.new_ptr(ARENA, false).unwrap_err();

    assert_eq!(err, MemoryError::OutOfMemory { requested: ARENA });
    assert_eq!(mm.mem_error(), -108);
    assert_eq!(mm.arena().read_word(MEM_ERR_CELL).unwrap(), 0xFF94);

    // The manager stays usable after a failure
    assert!(mm.new_ptr(128, false).is_ok());
}

proptest! {
    #[test]
    fn prop_live_blocks_never_overlap(
        ops in prop::collection::vec((1u32..2048, any::<bool>()), 1..120),
    ) {
        let mut mm = manager();
        let mut live: Vec<(u32, u32)> = Vec::new();

        for (size, dispose_oldest) in ops {
            if dispose_oldest && !live.is_empty() {
                let (ptr, _) = live.remove(0);
                prop_assert!(mm.dispose_ptr(ptr).is_ok());
                continue;
            }
            let ptr = mm.new_ptr(size, false).unwrap();
            prop_assert!(ptr >= RESERVED && ptr + size <= ARENA);
            for &(other, other_size) in &live {
                prop_assert!(ptr + size <= other || other + other_size <= ptr);
            }
            live.push((ptr, size));
        }
        prop_assert_eq!(mm.stats().live_pointers, live.len());
    }
}
