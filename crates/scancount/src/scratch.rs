#![allow(unsafe_code)]

//! 64-byte aligned counter scratch, owned per [`crate::QueryExecutor`].
//!
//! The hit extractor reads this buffer 64 bytes at a time; keeping the
//! allocation cache-line aligned means those reads are always in-bounds and
//! never straddle an unmapped page at the end of the allocation.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

/// Heap-resident, 64-byte aligned, zero-initialised counter buffer.
pub struct AlignedCounters {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// SAFETY: `AlignedCounters` owns its allocation exclusively; no other
// pointer to it exists, so moving it across threads is sound.
unsafe impl Send for AlignedCounters {}

impl AlignedCounters {
    /// Builds a zero-filled buffer of at least `len` bytes, rounded up to a
    /// multiple of 64.
    #[must_use]
    pub fn new(len: usize) -> Self {
        let rounded = len.next_multiple_of(64).max(64);
        let layout =
            Layout::from_size_align(rounded, 64).expect("counter scratch layout is always valid");
        // SAFETY: `layout` has non-zero size (at least 64, from `.max(64)`).
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            handle_alloc_error(layout)
        };
        Self {
            ptr,
            len: rounded,
            layout,
        }
    }

    /// Grows the buffer to at least `len` bytes, reallocating (and
    /// zero-filling) only if it is currently smaller.
    pub fn ensure_len(&mut self, len: usize) {
        if len <= self.len {
            return;
        }
        *self = Self::new(len);
    }

    /// Zero-fills the entire buffer.
    pub fn zero(&mut self) {
        // SAFETY: `ptr` is valid for `len` bytes and uniquely owned by `self`.
        unsafe { std::ptr::write_bytes(self.ptr.as_ptr(), 0, self.len) };
    }
}

impl std::ops::Deref for AlignedCounters {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: `ptr` is valid for `len` initialised bytes for the life of `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl std::ops::DerefMut for AlignedCounters {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: `ptr` is valid for `len` initialised bytes and uniquely borrowed here.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedCounters {
    fn drop(&mut self) {
        // SAFETY: `ptr` and `layout` are exactly what `new` allocated.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

impl std::fmt::Debug for AlignedCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedCounters")
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_zeroed_and_cache_aligned() {
        let buf = AlignedCounters::new(100);
        assert!(buf.len() >= 100);
        assert_eq!(buf.as_ptr() as usize % 64, 0);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn ensure_len_grows_and_reinitialises_to_zero() {
        let mut buf = AlignedCounters::new(64);
        buf[0] = 7;
        buf.ensure_len(256);
        assert!(buf.len() >= 256);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn ensure_len_is_a_no_op_when_already_large_enough() {
        let mut buf = AlignedCounters::new(256);
        buf[5] = 3;
        buf.ensure_len(64);
        assert_eq!(buf[5], 3, "shrinking is never requested; buffer must be untouched");
    }

    #[test]
    fn zero_clears_existing_contents() {
        let mut buf = AlignedCounters::new(64);
        buf[3] = 9;
        buf.zero();
        assert!(buf.iter().all(|&b| b == 0));
    }
}
