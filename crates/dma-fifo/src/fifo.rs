//! Core FIFO engine: index model, bulk paths, overwrite policy.
//!
//! `Fifo` keeps two *unmasked* cursors that advance modulo `2 × depth`
//! rather than `depth`.  The storage slot for a cursor is the cursor reduced
//! by `depth` when it lies in the upper half of the cursor range; the extra
//! bit of cursor range is what distinguishes "empty" (cursors equal) from
//! "full" (cursors `depth` apart) without a shared counter or flag.
//!
//! Because emptiness, fullness, and occupancy all derive from the cursor
//! difference, the writer only ever stores the write cursor and the reader
//! only ever stores the read cursor.  There is no shared read-modify-write,
//! so a single-writer/single-reader pair is safe across independent
//! execution contexts (task + ISR) with no lock.
//!
//! Depths that are not a power of two are supported: cursor wrap-around in
//! the native `u16` index space is corrected by a reserved *guard space* of
//! `u16::MAX - (2 × depth - 1)` indices.  The guard space also bounds how
//! long an overwriting writer can run ahead of the reader before overflow
//! detection becomes ambiguous; see [`Fifo::overflowed`].

use core::marker::PhantomData;
use core::sync::atomic::{
    AtomicU16,
    Ordering::{Acquire, Relaxed, Release},
};

use crate::copy::{self, CopyMode};
use crate::lock::{Lock, NoopLock};

/// Maximum supported depth in items.
///
/// Cursors live in a `u16` index space and advance modulo `2 × depth`, so
/// the depth may not exceed half the `u16` range.
pub const MAX_DEPTH: u16 = u16::MAX / 2;

/// Errors returned when configuring a [`Fifo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `item_size` was zero.
    ZeroItemSize,
    /// The storage slice is smaller than one item.
    ZeroDepth,
    /// The storage slice holds more than [`MAX_DEPTH`] items.
    DepthTooLarge,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroItemSize => write!(f, "item size must be non-zero"),
            Self::ZeroDepth => write!(f, "storage holds no complete item"),
            Self::DepthTooLarge => write!(f, "storage holds more than MAX_DEPTH items"),
        }
    }
}

/// Fixed-capacity SPSC FIFO over caller-owned storage.
///
/// One writer context and one reader context may operate concurrently with
/// no synchronization between them, provided each side is itself
/// single-threaded.  Additional contexts on either side must be serialized
/// through the injected lock `L` (see [`crate::lock`]).
///
/// Storage is borrowed for `'a` and never reallocated; trailing bytes that
/// do not make up a whole item are unused.
pub struct Fifo<'a, L: Lock = NoopLock> {
    storage: *mut u8,
    depth: u16,
    item_size: u16,
    /// Highest valid cursor value, `2 × depth − 1`.
    max_cursor: u16,
    /// Reserved index range, `u16::MAX − max_cursor`.  Adding it to a cursor
    /// is congruent to subtracting `2 × depth` in the native index space.
    guard: u16,
    overwritable: bool,
    /// Stepping of the external source address during writes.
    write_mode: CopyMode,
    /// Stepping of the external destination address during reads and peeks.
    read_mode: CopyMode,
    wr: AtomicU16,
    rd: AtomicU16,
    lock: L,
    _storage: PhantomData<&'a mut [u8]>,
}

// SAFETY: the storage pointer is derived from an exclusively borrowed
// `&'a mut [u8]`, so sending the Fifo moves the only handle to it.  The lock
// moves with the Fifo and must itself be Send.
unsafe impl<L: Lock + Send> Send for Fifo<'_, L> {}

// SAFETY: all interior mutation goes through the atomic cursors; storage
// slots are only touched on the side (writer or reader) that owns them under
// the single-writer/single-reader contract documented on the type.  Shared
// references may therefore be used from one writer context and one reader
// context concurrently.
unsafe impl<L: Lock + Sync> Sync for Fifo<'_, L> {}

impl<'a> Fifo<'a> {
    /// Configure a FIFO over `storage` with no lock (single writer, single
    /// reader).
    ///
    /// The depth is `storage.len() / item_size` items; pass a subslice for a
    /// smaller depth.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if `item_size` is zero, the storage holds no complete
    /// item, or the depth exceeds [`MAX_DEPTH`].
    pub fn new(
        storage: &'a mut [u8],
        item_size: u16,
        overwritable: bool,
    ) -> Result<Self, ConfigError> {
        Self::with_lock(storage, item_size, overwritable, NoopLock)
    }
}

impl<'a, L: Lock> Fifo<'a, L> {
    /// Configure a FIFO with an injected lock serializing checked operations.
    ///
    /// # Errors
    ///
    /// Same as [`Fifo::new`].
    #[allow(clippy::arithmetic_side_effects)] // Safety: depth validated against 1..=MAX_DEPTH first
    pub fn with_lock(
        storage: &'a mut [u8],
        item_size: u16,
        overwritable: bool,
        lock: L,
    ) -> Result<Self, ConfigError> {
        if item_size == 0 {
            return Err(ConfigError::ZeroItemSize);
        }
        let depth = storage.len() / usize::from(item_size);
        if depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if depth > usize::from(MAX_DEPTH) {
            return Err(ConfigError::DepthTooLarge);
        }
        let depth = depth as u16;
        let max_cursor = 2 * depth - 1;
        Ok(Self {
            storage: storage.as_mut_ptr(),
            depth,
            item_size,
            max_cursor,
            guard: u16::MAX - max_cursor,
            overwritable,
            write_mode: CopyMode::Increasing,
            read_mode: CopyMode::Increasing,
            wr: AtomicU16::new(0),
            rd: AtomicU16::new(0),
            lock,
            _storage: PhantomData,
        })
    }

    // ── Configuration ───────────────────────────────────────────────────────

    /// Capacity in items.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Bytes per item.
    pub fn item_size(&self) -> u16 {
        self.item_size
    }

    /// Whether a write to a full FIFO evicts the oldest item.
    pub fn is_overwritable(&self) -> bool {
        self.overwritable
    }

    /// Change the overwrite policy.  Takes effect on the next write.
    pub fn set_overwritable(&mut self, overwritable: bool) {
        self.overwritable = overwritable;
    }

    /// Stepping of the external *source* address during `write`/`write_n`.
    ///
    /// [`CopyMode::Constant`] reads every item from the same item-sized
    /// window, as when the source is a peripheral FIFO data register.
    pub fn set_write_copy_mode(&mut self, mode: CopyMode) {
        self.write_mode = mode;
    }

    /// Stepping of the external *destination* address during
    /// `read`/`read_n` and peeks.
    pub fn set_read_copy_mode(&mut self, mode: CopyMode) {
        self.read_mode = mode;
    }

    /// Reset both cursors to zero.
    ///
    /// Storage contents are untouched; stale bytes remain but are logically
    /// unreachable until overwritten.
    pub fn clear(&mut self) {
        *self.wr.get_mut() = 0;
        *self.rd.get_mut() = 0;
    }

    // ── Index model ─────────────────────────────────────────────────────────

    /// Advance a cursor by `offset` positions, wrapping modulo `2 × depth`.
    ///
    /// `offset` must be below `2 × depth`; every checked caller clamps it to
    /// an occupancy or free-space figure first.
    #[allow(clippy::arithmetic_side_effects)] // Safety: guard arithmetic is the modulo-2*depth wrap
    pub(crate) fn advance_index(&self, idx: u16, offset: u16) -> u16 {
        let next = idx.wrapping_add(offset);
        if idx > next || next > self.max_cursor {
            // Wrapped past the cursor range (or the native u16 range):
            // adding the guard is congruent to subtracting 2 * depth.
            next.wrapping_add(self.guard)
        } else {
            next
        }
    }

    /// Move a cursor back by `offset` positions, wrapping modulo `2 × depth`.
    #[allow(clippy::arithmetic_side_effects)] // Safety: guard arithmetic is the modulo-2*depth wrap
    pub(crate) fn backward_index(&self, idx: u16, offset: u16) -> u16 {
        let prev = idx.wrapping_sub(offset);
        if idx < prev || prev > self.max_cursor {
            prev.wrapping_sub(self.guard)
        } else {
            prev
        }
    }

    /// Storage slot for a cursor value: the cursor reduced by `depth` when
    /// it lies in the upper half of the `2 × depth` range.
    #[allow(clippy::arithmetic_side_effects)] // Safety: idx < 2 * depth invariant
    pub(crate) fn slot(&self, idx: u16) -> u16 {
        if idx >= self.depth {
            idx - self.depth
        } else {
            idx
        }
    }

    /// Raw occupancy from the cursor difference modulo `2 × depth`.
    ///
    /// May exceed `depth` when an overwriting writer has run ahead of the
    /// reader; see [`Fifo::overflowed`].
    #[allow(clippy::arithmetic_side_effects)] // Safety: cursors < 2 * depth; 2 * depth <= u16::MAX
    pub(crate) fn occupancy(&self, wr: u16, rd: u16) -> u16 {
        if wr >= rd {
            wr - rd
        } else {
            2 * self.depth - (rd - wr)
        }
    }

    /// Occupancy and effective read cursor, resynchronized to the oldest
    /// valid item when the reader has been overtaken.
    pub(crate) fn read_index_and_count(&self, wr: u16, rd: u16) -> (u16, u16) {
        let raw = self.occupancy(wr, rd);
        if raw > self.depth {
            (self.depth, self.backward_index(wr, self.depth))
        } else {
            (raw, rd)
        }
    }

    // ── Occupancy metrics ───────────────────────────────────────────────────

    /// Number of items currently held, clamped to the depth.
    pub fn count(&self) -> u16 {
        let raw = self.occupancy(self.wr.load(Acquire), self.rd.load(Acquire));
        raw.min(self.depth)
    }

    /// `true` when no items are present.
    pub fn is_empty(&self) -> bool {
        self.wr.load(Acquire) == self.rd.load(Acquire)
    }

    /// `true` when the FIFO holds `depth` (or, after overflow, more) items.
    pub fn is_full(&self) -> bool {
        self.occupancy(self.wr.load(Acquire), self.rd.load(Acquire)) >= self.depth
    }

    /// Free space in items.
    #[allow(clippy::arithmetic_side_effects)] // Safety: count() <= depth
    pub fn remaining(&self) -> u16 {
        self.depth - self.count()
    }

    /// Best-effort overflow check.
    ///
    /// Returns `true` when an overwriting writer has run ahead of the
    /// reader past a full buffer.  Reliable only while the writer's lead
    /// stays below `2 × depth` items; beyond that the cursor distance is
    /// ambiguous and overflow is undetectable.  This window is a deliberate
    /// trade against a wider counter that writer and reader would have to
    /// share.
    pub fn overflowed(&self) -> bool {
        self.occupancy(self.wr.load(Acquire), self.rd.load(Acquire)) > self.depth
    }

    /// Resynchronize the read cursor to the oldest valid item after a
    /// detected overflow.  No effect when not overflowed.
    pub fn correct_read_pointer(&self) {
        self.lock.with(|| {
            let wr = self.wr.load(Acquire);
            let rd = self.rd.load(Relaxed);
            if self.occupancy(wr, rd) > self.depth {
                self.rd.store(self.backward_index(wr, self.depth), Release);
            }
        });
    }

    // ── Write path ──────────────────────────────────────────────────────────

    /// Write a single item.
    ///
    /// Fails (no state change) when the FIFO is full and not overwritable,
    /// or when `item` is shorter than one item.  In overwritable mode a
    /// write to a full FIFO evicts the oldest item and succeeds.
    pub fn write(&self, item: &[u8]) -> bool {
        self.write_n(item, 1) == 1
    }

    /// Write up to `n` items from `data`, honoring the write copy mode.
    ///
    /// Clamps to free space unless overwritable.  With [`CopyMode::Increasing`]
    /// `data` must supply `n` items (fewer items clamp `n`); with
    /// [`CopyMode::Constant`] `data` is a single item-sized window read once
    /// per item.  Returns the number of items actually written.
    #[allow(clippy::arithmetic_side_effects)] // Safety: n/cursors bounded by depth and 2*depth invariants
    pub fn write_n(&self, data: &[u8], n: u16) -> u16 {
        let mut n = self.clamp_external(data.len(), n, self.write_mode);
        if n == 0 {
            return 0;
        }
        self.lock.with(|| {
            let mut wr = self.wr.load(Relaxed);
            let rd = self.rd.load(Acquire);
            let raw = self.occupancy(wr, rd);
            let mut src = data.as_ptr();
            if !self.overwritable {
                n = n.min(self.depth - raw.min(self.depth));
            } else if n >= self.depth {
                // Only the newest `depth` items can survive: rebase onto a
                // full buffer starting at the read position.
                if self.write_mode == CopyMode::Increasing {
                    let skip = usize::from(n - self.depth) * usize::from(self.item_size);
                    // SAFETY: data supplies n items (clamped above), so the
                    // first n - depth of them may be skipped in bounds.
                    src = unsafe { src.add(skip) };
                }
                n = self.depth;
                wr = rd;
            } else if u32::from(raw) + u32::from(n) >= 2 * u32::from(self.depth) {
                // The write cursor would lap the read cursor far enough to
                // alias the cursor arithmetic; rebase the read cursor so the
                // buffer is exactly full after this write.  Computed in u32:
                // raw + n may exceed the u16 range near MAX_DEPTH.
                let evict = (u32::from(raw) + u32::from(n) - u32::from(self.depth)) as u16;
                self.rd.store(self.advance_index(rd, evict), Release);
            }
            if n == 0 {
                return 0;
            }
            // SAFETY: the destination slots lie inside storage (slot <
            // depth), the wrap split below keeps each segment linear, and
            // src supplies n items per the clamp above.
            unsafe { self.copy_in(self.slot(wr), src, n) };
            self.wr.store(self.advance_index(wr, n), Release);
            n
        })
    }

    // ── Read / peek path ────────────────────────────────────────────────────

    /// Read (consume) a single item into `out`.
    ///
    /// Returns `false` when the FIFO is empty or `out` is shorter than one
    /// item.
    pub fn read(&self, out: &mut [u8]) -> bool {
        self.read_n(out, 1) == 1
    }

    /// Read (consume) up to `n` items into `out`, honoring the read copy
    /// mode.  Clamps to occupancy; returns the number of items consumed.
    ///
    /// A reader that has been overtaken by an overwriting writer is first
    /// resynchronized to the oldest valid item, so the items returned are
    /// always the newest `depth` (or fewer), oldest-first.
    pub fn read_n(&self, out: &mut [u8], n: u16) -> u16 {
        let n = self.clamp_external(out.len(), n, self.read_mode);
        self.lock.with(|| {
            let wr = self.wr.load(Acquire);
            let rd = self.rd.load(Relaxed);
            let (available, rd) = self.read_index_and_count(wr, rd);
            let n = n.min(available);
            if n == 0 {
                // Nothing consumed: leave the stored cursor alone, as the
                // peek paths do.
                return 0;
            }
            // SAFETY: rd's slot plus the wrap split stays inside
            // storage; out holds n items per the clamp above.
            unsafe { self.copy_out(self.slot(rd), out.as_mut_ptr(), n) };
            // Also persists the overflow resynchronization, if any.
            self.rd.store(self.advance_index(rd, n), Release);
            n
        })
    }

    /// Copy out the oldest item without consuming it.
    pub fn peek(&self, out: &mut [u8]) -> bool {
        self.peek_at(0, out)
    }

    /// Copy out the item `pos` positions past the read cursor without
    /// consuming anything.  Returns `false` when fewer than `pos + 1` items
    /// are held.
    pub fn peek_at(&self, pos: u16, out: &mut [u8]) -> bool {
        self.peek_at_n(pos, out, 1) == 1
    }

    /// Copy out up to `n` items starting `pos` positions past the read
    /// cursor.  Never moves the read cursor; returns the number of items
    /// copied.
    #[allow(clippy::arithmetic_side_effects)] // Safety: pos < available <= depth
    pub fn peek_at_n(&self, pos: u16, out: &mut [u8], n: u16) -> u16 {
        let n = self.clamp_external(out.len(), n, self.read_mode);
        self.lock.with(|| {
            let wr = self.wr.load(Acquire);
            let rd = self.rd.load(Relaxed);
            let (available, rd) = self.read_index_and_count(wr, rd);
            if pos >= available {
                return 0;
            }
            let n = n.min(available - pos);
            if n == 0 {
                return 0;
            }
            let idx = self.advance_index(rd, pos);
            // SAFETY: idx's slot plus the wrap split stays inside storage;
            // out holds n items per the clamp above.
            unsafe { self.copy_out(self.slot(idx), out.as_mut_ptr(), n) };
            n
        })
    }

    // ── Cross-buffer transfer ───────────────────────────────────────────────

    /// Copy up to `n` items, starting `offset` positions past the read
    /// cursor, directly into `target`'s storage without consuming them.
    ///
    /// Clamped by this FIFO's occupancy and by `target`'s acceptance (its
    /// free space, or its overwrite policy).  `target` must be configured
    /// with the same item size as this FIFO and with
    /// [`CopyMode::Increasing`] for writes.  Returns the number of items
    /// transferred.
    pub fn peek_n_into<M: Lock>(&self, target: &Fifo<'_, M>, offset: u16, n: u16) -> u16 {
        self.lock.with(|| self.transfer_into(target, offset, n).0)
    }

    /// Like [`Fifo::peek_n_into`], but consumes the transferred items *and*
    /// the `offset` items skipped over (use `peek_n_into` to keep them).
    /// When nothing can be transferred (the target accepts zero items) the
    /// source is left untouched, skipped items included, so the call is
    /// safe to retry.
    #[allow(clippy::arithmetic_side_effects)] // Safety: offset + moved <= available <= depth
    pub fn read_n_into<M: Lock>(&self, target: &Fifo<'_, M>, offset: u16, n: u16) -> u16 {
        self.lock.with(|| {
            let (moved, rd) = self.transfer_into(target, offset, n);
            if moved > 0 {
                self.rd.store(self.advance_index(rd, offset + moved), Release);
            }
            moved
        })
    }

    /// Transfer worker: walks this ring's linear read spans and feeds them
    /// to `target.write_n`.  Returns (items moved, effective read cursor);
    /// cursors are left untouched.
    #[allow(clippy::arithmetic_side_effects)] // Safety: run/offset sums bounded by available <= depth
    fn transfer_into<M: Lock>(&self, target: &Fifo<'_, M>, offset: u16, n: u16) -> (u16, u16) {
        let wr = self.wr.load(Acquire);
        let rd = self.rd.load(Relaxed);
        let (available, rd) = self.read_index_and_count(wr, rd);
        if offset >= available {
            return (0, rd);
        }
        let mut remaining = n.min(available - offset);
        let mut moved = 0u16;
        while remaining > 0 {
            let slot = self.slot(self.advance_index(rd, offset + moved));
            let run = remaining.min(self.depth - slot);
            let bytes = usize::from(run) * usize::from(self.item_size);
            // SAFETY: the run lies wholly inside this ring's storage and
            // covers only slots owned by the reader side ([rd, wr)).
            let span = unsafe {
                core::slice::from_raw_parts(
                    self.storage.add(usize::from(slot) * usize::from(self.item_size)),
                    bytes,
                )
            };
            let written = target.write_n(span, run);
            moved += written;
            remaining -= written;
            if written < run {
                break; // target full and not overwritable
            }
        }
        (moved, rd)
    }

    // ── Internal copy helpers ───────────────────────────────────────────────

    /// Clamp an item count to what the external buffer can supply/accept
    /// under the given copy mode.
    #[allow(clippy::arithmetic_side_effects)] // Safety: item_size validated non-zero at configuration
    fn clamp_external(&self, len_bytes: usize, n: u16, mode: CopyMode) -> u16 {
        let item_size = usize::from(self.item_size);
        match mode {
            CopyMode::Increasing => {
                let cap = len_bytes / item_size;
                if cap >= usize::from(n) {
                    n
                } else {
                    cap as u16
                }
            }
            CopyMode::Constant => {
                if len_bytes >= item_size {
                    n
                } else {
                    0
                }
            }
        }
    }

    /// Two-segment wrap-aware copy from `src` into storage at `slot`.
    ///
    /// # Safety
    ///
    /// `slot < depth`, `n <= depth`, and `src` must satisfy the
    /// [`copy::copy_items_in`] contract for `n` items under the write copy
    /// mode.
    #[allow(clippy::arithmetic_side_effects)] // Safety: slot < depth and n <= depth bound all sums
    unsafe fn copy_in(&self, slot: u16, src: *const u8, n: u16) {
        let item_size = usize::from(self.item_size);
        let first = n.min(self.depth - slot);
        let second = n - first;
        // SAFETY: first items fit between slot and the physical end.
        unsafe {
            let dst = self.storage.add(usize::from(slot) * item_size);
            copy::copy_items_in(dst, src, usize::from(first), item_size, self.write_mode);
        }
        if second > 0 {
            let src = match self.write_mode {
                // SAFETY: src supplies n items; skip the first segment.
                CopyMode::Increasing => unsafe { src.add(usize::from(first) * item_size) },
                CopyMode::Constant => src,
            };
            // SAFETY: the remainder restarts at the physical start and
            // second <= depth - first keeps it inside storage.
            unsafe {
                copy::copy_items_in(self.storage, src, usize::from(second), item_size, self.write_mode);
            }
        }
    }

    /// Two-segment wrap-aware copy from storage at `slot` out to `dst`.
    ///
    /// # Safety
    ///
    /// `slot < depth`, `n <= depth`, and `dst` must satisfy the
    /// [`copy::copy_items_out`] contract for `n` items under the read copy
    /// mode.
    #[allow(clippy::arithmetic_side_effects)] // Safety: slot < depth and n <= depth bound all sums
    unsafe fn copy_out(&self, slot: u16, dst: *mut u8, n: u16) {
        let item_size = usize::from(self.item_size);
        let first = n.min(self.depth - slot);
        let second = n - first;
        // SAFETY: first items fit between slot and the physical end.
        unsafe {
            let src = self.storage.add(usize::from(slot) * item_size);
            copy::copy_items_out(dst, src, usize::from(first), item_size, self.read_mode);
        }
        if second > 0 {
            let dst = match self.read_mode {
                // SAFETY: dst accepts n items; skip the first segment.
                CopyMode::Increasing => unsafe { dst.add(usize::from(first) * item_size) },
                CopyMode::Constant => dst,
            };
            // SAFETY: the remainder restarts at the physical start and
            // second <= depth - first keeps it inside storage.
            unsafe {
                copy::copy_items_out(dst, self.storage, usize::from(second), item_size, self.read_mode);
            }
        }
    }

    // Raw cursor accessors for the dma module.

    pub(crate) fn wr_cursor(&self) -> &AtomicU16 {
        &self.wr
    }

    pub(crate) fn rd_cursor(&self) -> &AtomicU16 {
        &self.rd
    }

    pub(crate) fn storage_ptr(&self) -> *mut u8 {
        self.storage
    }
}

impl<L: Lock> core::fmt::Debug for Fifo<'_, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Fifo")
            .field("depth", &self.depth)
            .field("item_size", &self.item_size)
            .field("count", &self.count())
            .field("overwritable", &self.overwritable)
            .finish_non_exhaustive()
    }
}
