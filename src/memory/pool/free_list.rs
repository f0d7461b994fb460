/*!
 * Segregated Free List
 * Size-indexed lookup of free pool spans
 */

use crate::core::limits::{MEDIUM_SPAN_MAX, SMALL_SPAN_MAX};
use crate::core::types::{GuestAddr, Size};
use std::collections::BTreeMap;

/// Free span inside the pool region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct FreeSpan {
    pub offset: GuestAddr,
    pub size: Size,
}

const SMALL_BUCKETS: usize = 7; // 64, 128, ..., 4096
const MEDIUM_BUCKETS: usize = 15; // 8KB, 12KB, ..., 64KB

/// Segregated free list
/// - Small spans (<=4KB): power-of-2 buckets
/// - Medium spans (<=64KB): 4KB increment buckets
/// - Large spans: BTreeMap keyed by size
#[derive(Debug)]
pub(super) struct SegregatedFreeList {
    small: Vec<Vec<FreeSpan>>,
    medium: Vec<Vec<FreeSpan>>,
    large: BTreeMap<Size, Vec<FreeSpan>>,
}

impl SegregatedFreeList {
    pub fn new() -> Self {
        Self {
            small: vec![Vec::new(); SMALL_BUCKETS],
            medium: vec![Vec::new(); MEDIUM_BUCKETS],
            large: BTreeMap::new(),
        }
    }

    // Bucket i holds (2^(i+5), 2^(i+6)], bucket 0 everything up to 64
    fn small_bucket_index(size: Size) -> Option<usize> {
        if size > SMALL_SPAN_MAX {
            return None;
        }
        let bucket = if size <= 64 {
            0
        } else {
            (size.next_power_of_two().trailing_zeros() - 6) as usize
        };
        Some(bucket.min(SMALL_BUCKETS - 1))
    }

    // Bucket i holds (4KB * (i + 1), 4KB * (i + 2)]
    fn medium_bucket_index(size: Size) -> Option<usize> {
        if size <= SMALL_SPAN_MAX || size > MEDIUM_SPAN_MAX {
            return None;
        }
        let bucket = (size.div_ceil(4 * 1024) as usize).saturating_sub(2);
        Some(bucket.min(MEDIUM_BUCKETS - 1))
    }

    pub fn insert(&mut self, span: FreeSpan) {
        if let Some(idx) = Self::small_bucket_index(span.size) {
            self.small[idx].push(span);
        } else if let Some(idx) = Self::medium_bucket_index(span.size) {
            self.medium[idx].push(span);
        } else {
            self.large.entry(span.size).or_default().push(span);
        }
    }

    /// Remove a specific span, returning whether it was present
    pub fn remove(&mut self, span: FreeSpan) -> bool {
        let bucket = if let Some(idx) = Self::small_bucket_index(span.size) {
            &mut self.small[idx]
        } else if let Some(idx) = Self::medium_bucket_index(span.size) {
            &mut self.medium[idx]
        } else {
            let Some(spans) = self.large.get_mut(&span.size) else {
                return false;
            };
            let found = take_span(spans, span.offset);
            if spans.is_empty() {
                self.large.remove(&span.size);
            }
            return found;
        };
        take_span(bucket, span.offset)
    }

    /// Remove and return the smallest span that holds `size` bytes
    pub fn find_best_fit(&mut self, size: Size) -> Option<FreeSpan> {
        if let Some(start) = Self::small_bucket_index(size) {
            // The first bucket may hold spans below the request
            for bucket in &mut self.small[start..] {
                if let Some(span) = take_smallest_fit(bucket, size) {
                    return Some(span);
                }
            }
        }

        if size <= MEDIUM_SPAN_MAX {
            let start = Self::medium_bucket_index(size.max(SMALL_SPAN_MAX + 1)).unwrap_or(0);
            for bucket in &mut self.medium[start..] {
                if let Some(span) = take_smallest_fit(bucket, size) {
                    return Some(span);
                }
            }
        }

        let key = self
            .large
            .range(size..)
            .find(|(_, spans)| !spans.is_empty())
            .map(|(s, _)| *s)?;
        let spans = self.large.get_mut(&key)?;
        let span = spans.pop();
        if spans.is_empty() {
            self.large.remove(&key);
        }
        span
    }

    pub fn len(&self) -> usize {
        let small: usize = self.small.iter().map(Vec::len).sum();
        let medium: usize = self.medium.iter().map(Vec::len).sum();
        let large: usize = self.large.values().map(Vec::len).sum();
        small + medium + large
    }

    pub fn clear(&mut self) {
        self.small.iter_mut().for_each(Vec::clear);
        self.medium.iter_mut().for_each(Vec::clear);
        self.large.clear();
    }
}

fn take_span(bucket: &mut Vec<FreeSpan>, offset: GuestAddr) -> bool {
    match bucket.iter().position(|s| s.offset == offset) {
        Some(pos) => {
            bucket.swap_remove(pos);
            true
        }
        None => false,
    }
}

fn take_smallest_fit(bucket: &mut Vec<FreeSpan>, size: Size) -> Option<FreeSpan> {
    let pos = bucket
        .iter()
        .enumerate()
        .filter(|(_, s)| s.size >= size)
        .min_by_key(|(_, s)| (s.size, s.offset))
        .map(|(i, _)| i)?;
    Some(bucket.swap_remove(pos))
}
