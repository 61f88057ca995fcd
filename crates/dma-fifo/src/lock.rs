//! Optional mutual exclusion around checked FIFO operations.
//!
//! The single-writer/single-reader fast path needs no lock: the index model
//! guarantees that the two sides never read-modify-write shared state.  A
//! lock is only required when *more than one* context may call on the same
//! side (two tasks both writing, say).  The FIFO takes the lock as a type
//! parameter so that the interrupt-only configuration pays nothing:
//! [`NoopLock`] compiles away entirely.
//!
//! The raw cursor primitives in [`crate::dma`] deliberately bypass the lock;
//! they are only sound where the caller has independently guaranteed
//! exclusivity (typically the matching DMA completion interrupt).

/// Scoped mutual exclusion for checked FIFO operations.
///
/// Implementations must not panic and must not block indefinitely against
/// the contexts the FIFO is used from (an implementation that disables
/// interrupts, like [`CriticalSectionLock`], satisfies this trivially).
pub trait Lock {
    /// Run `f` with the lock held.
    fn with<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// No-op lock for the single-writer/single-reader configuration.
///
/// This is the default: each side of the FIFO is driven from exactly one
/// execution context, so the index model alone is sufficient and the lock
/// vanishes at compile time.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLock;

impl Lock for NoopLock {
    #[inline(always)]
    fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

/// Lock backed by a global critical section.
///
/// Serializes callers by disabling interrupts (or the platform equivalent
/// supplied by the linked `critical-section` implementation).  Use this when
/// multiple non-ISR contexts share one side of the FIFO.
#[cfg(feature = "critical-section")]
#[derive(Debug, Default, Clone, Copy)]
pub struct CriticalSectionLock;

#[cfg(feature = "critical-section")]
impl Lock for CriticalSectionLock {
    #[inline]
    fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        critical_section::with(|_cs| f())
    }
}
