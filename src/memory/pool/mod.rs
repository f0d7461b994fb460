/*!
 * Pool Allocator
 *
 * Span allocator over a sub-region of the arena. Hands out arena-relative
 * offsets aligned to the configured minimum alignment.
 *
 * ## Features
 *
 * - **Best fit**: segregated free list, smallest span that holds the request
 * - **Splitting**: the unused tail of a span goes back to the free list
 * - **Coalescing**: freed spans merge with free neighbours immediately
 * - **Out-of-band bookkeeping**: guest writes cannot corrupt the free list
 */

mod free_list;

use super::traits::BackingAllocator;
use super::types::{MemoryError, MemoryResult, PoolStats};
use crate::core::types::{GuestAddr, Size};
use ahash::AHashMap;
use free_list::{FreeSpan, SegregatedFreeList};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Pool allocator
#[derive(Debug)]
pub struct PoolAllocator {
    region: GuestAddr,
    length: Size,
    alignment: Size,
    free_list: SegregatedFreeList,
    // Same spans keyed by offset, for neighbour lookup when coalescing
    free_spans: BTreeMap<GuestAddr, Size>,
    live: AHashMap<GuestAddr, Size>,
    stats: PoolStats,
}

impl PoolAllocator {
    /// Create an unconfigured pool; every allocation fails until `init`
    pub fn new() -> Self {
        Self {
            region: 0,
            length: 0,
            alignment: 1,
            free_list: SegregatedFreeList::new(),
            free_spans: BTreeMap::new(),
            live: AHashMap::new(),
            stats: PoolStats::default(),
        }
    }

    /// Start of the aligned pool region
    pub fn region(&self) -> GuestAddr {
        self.region
    }

    /// Usable length of the aligned pool region
    pub fn length(&self) -> Size {
        self.length
    }

    pub fn alignment(&self) -> Size {
        self.alignment
    }

    /// Size of the live span at `offset`, after alignment rounding
    pub fn span_size(&self, offset: GuestAddr) -> Option<Size> {
        self.live.get(&offset).copied()
    }

    /// Total free bytes, possibly fragmented
    pub fn free_bytes(&self) -> u64 {
        self.free_spans.values().map(|&s| s as u64).sum()
    }

    fn round_up(&self, size: Size) -> Option<Size> {
        let mask = self.alignment - 1;
        size.max(1).checked_add(mask).map(|s| s & !mask)
    }

    fn insert_free(&mut self, span: FreeSpan) {
        self.free_spans.insert(span.offset, span.size);
        self.free_list.insert(span);
    }

    fn remove_free(&mut self, span: FreeSpan) {
        self.free_spans.remove(&span.offset);
        self.free_list.remove(span);
    }
}

impl BackingAllocator for PoolAllocator {
    fn init(&mut self, region: GuestAddr, length: Size, alignment: Size) -> MemoryResult<()> {
        let failed = MemoryError::PoolInit {
            region,
            length,
            alignment,
        };
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(failed);
        }

        let mask = alignment as u64 - 1;
        let start = (region as u64 + mask) & !mask;
        let end = (region as u64 + length as u64) & !mask;
        if end <= start || end > u32::MAX as u64 {
            return Err(failed);
        }

        self.region = start as GuestAddr;
        self.length = (end - start) as Size;
        self.alignment = alignment;
        self.free_list.clear();
        self.free_spans.clear();
        self.live.clear();
        self.stats = PoolStats::default();
        self.insert_free(FreeSpan {
            offset: self.region,
            size: self.length,
        });

        info!(
            "Pool initialized at 0x{:08x} with {} bytes ({}-byte alignment)",
            self.region, self.length, self.alignment
        );
        Ok(())
    }

    fn allocate(&mut self, size: Size) -> Option<GuestAddr> {
        self.stats.allocations += 1;

        let rounded = self.round_up(size);
        let span = rounded.and_then(|r| self.free_list.find_best_fit(r).map(|s| (r, s)));
        let Some((rounded, span)) = span else {
            self.stats.failed_allocations += 1;
            debug!(
                "Pool exhausted: {} bytes requested, {} free",
                size,
                self.free_bytes()
            );
            return None;
        };

        self.free_spans.remove(&span.offset);
        if span.size > rounded {
            self.insert_free(FreeSpan {
                offset: span.offset + rounded,
                size: span.size - rounded,
            });
        }

        self.live.insert(span.offset, rounded);
        self.stats.bytes_in_use += rounded as u64;
        Some(span.offset)
    }

    fn free(&mut self, offset: GuestAddr) {
        let Some(size) = self.live.remove(&offset) else {
            warn!("Pool free of unknown span 0x{:08x} ignored", offset);
            return;
        };
        self.stats.frees += 1;
        self.stats.bytes_in_use -= size as u64;

        let mut merged = FreeSpan { offset, size };

        let before = self
            .free_spans
            .range(..offset)
            .next_back()
            .map(|(&o, &s)| FreeSpan { offset: o, size: s });
        if let Some(prev) = before.filter(|p| p.offset + p.size == offset) {
            self.remove_free(prev);
            merged = FreeSpan {
                offset: prev.offset,
                size: prev.size + merged.size,
            };
        }

        let end = merged.offset + merged.size;
        if let Some(&next_size) = self.free_spans.get(&end) {
            self.remove_free(FreeSpan {
                offset: end,
                size: next_size,
            });
            merged.size += next_size;
        }

        self.insert_free(merged);
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            free_spans: self.free_list.len(),
            ..self.stats
        }
    }
}

impl Default for PoolAllocator {
    fn default() -> Self {
        Self::new()
    }
}
