//! Heap high-water-mark tracking.
//!
//! [`TrackingAllocator`] wraps the system allocator and keeps a running count
//! of live heap bytes plus the highest value seen. A [`MemoryWindow`] resets
//! the high-water mark to the current level and later reports how far above
//! that baseline the heap grew.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

static CURRENT: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);

pub struct TrackingAllocator;

impl TrackingAllocator {
    pub const fn new() -> Self {
        TrackingAllocator
    }
}

impl Default for TrackingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

fn record_alloc(size: usize) {
    let now = CURRENT.fetch_add(size, Ordering::Relaxed) + size;
    PEAK.fetch_max(now, Ordering::Relaxed);
}

fn record_dealloc(size: usize) {
    CURRENT.fetch_sub(size, Ordering::Relaxed);
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        record_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            if new_size > layout.size() {
                record_alloc(new_size - layout.size());
            } else {
                record_dealloc(layout.size() - new_size);
            }
        }
        new_ptr
    }
}

/// Live heap bytes currently tracked.
pub fn current_bytes() -> usize {
    CURRENT.load(Ordering::Relaxed)
}

/// Start marker for a peak-memory measurement.
///
/// Only meaningful while a single window is open at a time; the runner opens
/// exactly one per measured iteration.
#[derive(Debug)]
pub struct MemoryWindow {
    baseline: usize,
}

impl MemoryWindow {
    pub fn open() -> Self {
        let baseline = CURRENT.load(Ordering::Relaxed);
        PEAK.store(baseline, Ordering::Relaxed);
        MemoryWindow { baseline }
    }

    /// Bytes allocated above the baseline at the highest point so far.
    pub fn peak_bytes(&self) -> usize {
        PEAK.load(Ordering::Relaxed).saturating_sub(self.baseline)
    }

    pub fn close(self) -> usize {
        self.peak_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hint::black_box;

    const MIB: usize = 1024 * 1024;

    #[test]
    fn test_window_sees_transient_allocation() {
        let window = MemoryWindow::open();
        let buffer = black_box(vec![1u8; 4 * MIB]);
        // Other test threads share the counters, so only a loose lower bound holds.
        assert!(window.peak_bytes() >= 3 * MIB);
        drop(buffer);
        let _ = window.close();
    }

    #[test]
    fn test_live_bytes_follow_allocations() {
        let before = current_bytes();
        let buffer = black_box(vec![7u8; 8 * MIB]);
        assert!(current_bytes() + MIB >= before + buffer.len());
    }
}
