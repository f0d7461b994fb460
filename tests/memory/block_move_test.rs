/*!
 * Block Move Tests
 * Overlapping and disjoint moves match a reference memmove
 */

use guest_mm::{Arena, MemoryManager};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const ARENA: u32 = 64 * 1024;

fn manager() -> MemoryManager {
    MemoryManager::init(Arena::new(ARENA), 0x1000).unwrap()
}

fn fill_pattern(mm: &mut MemoryManager, start: u32, len: u32) {
    let bytes = mm.arena_mut().slice_mut(start, len).unwrap();
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
}

#[test]
fn test_overlapping_forward() {
    let mut mm = manager();
    fill_pattern(&mut mm, 0x2000, 64);
    let mut expected = mm.arena().as_slice().to_vec();
    expected.copy_within(0x2000..0x2000 + 48, 0x2010);

    assert_eq!(mm.block_move_unchecked(0x2000, 0x2010, 48), 0);
    assert_eq!(mm.arena().as_slice(), expected.as_slice());
}

#[test]
fn test_overlapping_backward() {
    let mut mm = manager();
    fill_pattern(&mut mm, 0x2000, 64);
    let mut expected = mm.arena().as_slice().to_vec();
    expected.copy_within(0x2010..0x2010 + 48, 0x2000);

    assert_eq!(mm.block_move_unchecked(0x2010, 0x2000, 48), 0);
    assert_eq!(mm.arena().as_slice(), expected.as_slice());
}

#[test]
fn test_disjoint() {
    let mut mm = manager();
    fill_pattern(&mut mm, 0x3000, 128);

    assert_eq!(mm.block_move_unchecked(0x3000, 0x5000, 128), 0);
    assert_eq!(
        mm.arena().slice(0x3000, 128).unwrap(),
        mm.arena().slice(0x5000, 128).unwrap()
    );
}

proptest! {
    #[test]
    fn prop_matches_memmove(
        source in 0x1000u32..0x3000,
        dest in 0x1000u32..0x3000,
        count in 0u32..0x800,
    ) {
        let mut mm = manager();
        fill_pattern(&mut mm, 0x1000, 0x2800);
        let mut expected = mm.arena().as_slice().to_vec();
        let (s, d, n) = (source as usize, dest as usize, count as usize);
        expected.copy_within(s..s + n, d);

        prop_assert_eq!(mm.block_move_unchecked(source, dest, count), 0);
        prop_assert_eq!(mm.arena().as_slice(), expected.as_slice());
    }
}
