//! Non-binding cache-prefetch hints for vector payload access.
//!
//! Prefetching must never change observable behavior; every
//! implementation here is an opaque hint the CPU is free to ignore.

/// A prefetch strategy invoked ahead of a loop that is about to probe
/// a run of neighbor slot payloads.
pub trait Prefetcher: Send + Sync {
    /// Hints that `ptr` (the start of one vector payload) will be read
    /// soon.
    fn hint(&self, ptr: *const u8);
}

/// The no-op prefetcher; used when the caller disables prefetching or
/// on targets without a usable intrinsic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPrefetcher;

impl Prefetcher for NullPrefetcher {
    #[inline]
    fn hint(&self, _ptr: *const u8) {}
}

/// Issues a temporal, all-cache-levels prefetch hint for the first
/// cache line of the target vector.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPrefetcher;

impl Prefetcher for DefaultPrefetcher {
    #[inline]
    fn hint(&self, ptr: *const u8) {
        #[cfg(target_arch = "x86_64")]
        {
            // SAFETY: `_mm_prefetch` accepts any readable-or-not
            // pointer; it is documented to never fault even on
            // invalid addresses, so passing a not-yet-validated
            // pointer is sound.
            unsafe {
                use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
                _mm_prefetch(ptr.cast::<i8>(), _MM_HINT_T0);
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            // aarch64 prefetch intrinsics are unstable on the stable
            // channel as of this writing; skip rather than reach for
            // inline asm.
            let _ = ptr;
        }
    }
}
