//! Linear (DMA) access: contiguous spans and unchecked cursor movement.
//!
//! A DMA engine cannot follow the ring's wrap-around, so zero-copy transfers
//! work in two steps: ask for the longest *linear* span available
//! ([`Fifo::linear_read_info`] / [`Fifo::linear_write_info`]), hand that span
//! to the DMA controller, and from the completion interrupt advance the
//! matching cursor by the transferred count
//! ([`Fifo::advance_read_index`] / [`Fifo::advance_write_index`]).  If the
//! span was shorter than the request, the remainder continues past the wrap
//! point with a second span.
//!
//! The cursor-movement primitives here are an explicit trust boundary: they
//! perform **no bounds checking and no locking**.  Misuse does not fault;
//! it silently corrupts the occupancy invariant.  That is the deliberate
//! price of a check-free completion path; call them only from a context that
//! has exclusive use of the corresponding side (typically the matching DMA
//! completion interrupt).

use core::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use crate::fifo::Fifo;
use crate::lock::Lock;

/// A contiguous run of readable items inside the ring's storage.
///
/// `items` is zero when nothing is readable at the requested offset; `ptr`
/// still points into the backing storage and must not be read in that case.
#[derive(Debug, Clone, Copy)]
pub struct LinearRead {
    /// Start of the run.
    pub ptr: *const u8,
    /// Run length in items; never extends past the physical storage end.
    pub items: u16,
}

/// A contiguous run of writable slots inside the ring's storage.
#[derive(Debug, Clone, Copy)]
pub struct LinearWrite {
    /// Start of the run.
    pub ptr: *mut u8,
    /// Run length in items; never extends past the physical storage end.
    pub items: u16,
}

impl<L: Lock> Fifo<'_, L> {
    /// Longest contiguous readable run of at most `n` items, starting
    /// `offset` items past the read cursor.
    ///
    /// The run never crosses the physical end of storage and never exceeds
    /// the occupancy past `offset`.  A reader overtaken by an overwriting
    /// writer is resynchronized to the oldest valid item, and the corrected
    /// cursor is persisted so that a follow-up [`Fifo::advance_read_index`]
    /// consumes the spanned items rather than re-reading stale slots.
    #[allow(clippy::arithmetic_side_effects)] // Safety: offset < available <= depth bounds all sums
    pub fn linear_read_info(&self, offset: u16, n: u16) -> LinearRead {
        let wr = self.wr_cursor().load(Acquire);
        let rd = self.rd_cursor().load(Relaxed);
        let (available, rd) = {
            let (available, synced) = self.read_index_and_count(wr, rd);
            if synced != rd {
                // This is a reader-side call: persisting the correction is
                // sound, and the unchecked advance that follows the span
                // must start from it.
                self.rd_cursor().store(synced, Release);
            }
            (available, synced)
        };
        if offset >= available || n == 0 {
            return LinearRead {
                ptr: self.storage_ptr(),
                items: 0,
            };
        }
        let n = n.min(available - offset);
        let slot = self.slot(self.advance_index(rd, offset));
        let run = n.min(self.depth() - slot);
        LinearRead {
            // SAFETY: slot < depth keeps the pointer inside storage.
            ptr: unsafe {
                self.storage_ptr()
                    .add(usize::from(slot) * usize::from(self.item_size()))
            },
            items: run,
        }
    }

    /// Longest contiguous writable run of at most `n` items, starting
    /// `offset` items past the write cursor.
    ///
    /// The run never crosses the physical end of storage and never exceeds
    /// the free space past `offset`.  Linear write spans never evict, even
    /// on an overwritable ring: a DMA producer must not silently drop
    /// unread data.  Eviction is exclusive to [`Fifo::write_n`].
    #[allow(clippy::arithmetic_side_effects)] // Safety: offset < free <= depth bounds all sums
    pub fn linear_write_info(&self, offset: u16, n: u16) -> LinearWrite {
        let wr = self.wr_cursor().load(Relaxed);
        let rd = self.rd_cursor().load(Acquire);
        let raw = self.occupancy(wr, rd);
        let free = self.depth() - raw.min(self.depth());
        if offset >= free || n == 0 {
            return LinearWrite {
                ptr: self.storage_ptr(),
                items: 0,
            };
        }
        let n = n.min(free - offset);
        let slot = self.slot(self.advance_index(wr, offset));
        let run = n.min(self.depth() - slot);
        LinearWrite {
            // SAFETY: slot < depth keeps the pointer inside storage.
            ptr: unsafe {
                self.storage_ptr()
                    .add(usize::from(slot) * usize::from(self.item_size()))
            },
            items: run,
        }
    }

    /// Advance the write cursor by `n` items with no validation and no
    /// locking.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive use of the writer side, `n` must not
    /// exceed the free space actually filled (at most `depth`), and the item
    /// bytes must already be committed to storage.  Violating any of these
    /// corrupts the occupancy invariant for all subsequent operations.
    pub unsafe fn advance_write_index(&self, n: u16) {
        let wr = self.wr_cursor().load(Relaxed);
        self.wr_cursor().store(self.advance_index(wr, n), Release);
    }

    /// Move the write cursor back by `n` items with no validation and no
    /// locking.
    ///
    /// # Safety
    ///
    /// As [`Fifo::advance_write_index`]; `n` must not exceed the items the
    /// writer side has produced but wants to retract.
    pub unsafe fn backward_write_index(&self, n: u16) {
        let wr = self.wr_cursor().load(Relaxed);
        self.wr_cursor().store(self.backward_index(wr, n), Release);
    }

    /// Advance the read cursor by `n` items with no validation and no
    /// locking.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive use of the reader side and `n` must
    /// not exceed the current occupancy.  Violating either corrupts the
    /// occupancy invariant for all subsequent operations.
    pub unsafe fn advance_read_index(&self, n: u16) {
        let rd = self.rd_cursor().load(Relaxed);
        self.rd_cursor().store(self.advance_index(rd, n), Release);
    }

    /// Move the read cursor back by `n` items with no validation and no
    /// locking.
    ///
    /// # Safety
    ///
    /// As [`Fifo::advance_read_index`]; the `n` items behind the cursor must
    /// still be intact (not yet overwritten).
    pub unsafe fn backward_read_index(&self, n: u16) {
        let rd = self.rd_cursor().load(Relaxed);
        self.rd_cursor().store(self.backward_index(rd, n), Release);
    }
}
