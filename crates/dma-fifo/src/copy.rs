//! External-address stepping for bulk copies.
//!
//! Every bulk operation moves bytes between the ring's internal storage and
//! an *external* address supplied by the caller.  The ring's own addressing
//! always advances; [`CopyMode`] only controls whether the external address
//! advances with each item or stays fixed.  The fixed variant exists for
//! hardware where one side of the copy is a single peripheral FIFO data
//! register (for example the STM32 USB FIFO port).

/// Stepping behaviour of the external (non-ring) address during a bulk copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CopyMode {
    /// Advance the external address with each item.  The default.
    #[default]
    Increasing,
    /// Keep the external address fixed: every item is copied through the
    /// same item-sized window, byte-volatile, as required when the external
    /// side is a hardware FIFO register.
    Constant,
}

/// Copy `items` records from an external source into ring storage.
///
/// # Safety
///
/// - `dst` must be valid for writes of `items * item_size` bytes.
/// - In `Increasing` mode, `src` must be valid for reads of
///   `items * item_size` bytes; in `Constant` mode, for reads of
///   `item_size` bytes.
/// - The two regions must not overlap.
#[allow(clippy::arithmetic_side_effects)] // Safety: callers bound items/item_size by storage size
pub(crate) unsafe fn copy_items_in(
    dst: *mut u8,
    src: *const u8,
    items: usize,
    item_size: usize,
    mode: CopyMode,
) {
    match mode {
        CopyMode::Increasing => {
            // SAFETY: per contract, both regions cover items * item_size
            // bytes and do not overlap.
            unsafe { core::ptr::copy_nonoverlapping(src, dst, items * item_size) }
        }
        CopyMode::Constant => {
            for item in 0..items {
                for byte in 0..item_size {
                    // SAFETY: per contract, src is an item_size-wide window
                    // (re-read volatile per item, register semantics) and
                    // dst covers items * item_size bytes.
                    unsafe {
                        let value = core::ptr::read_volatile(src.add(byte));
                        dst.add(item * item_size + byte).write(value);
                    }
                }
            }
        }
    }
}

/// Copy `items` records from ring storage out to an external destination.
///
/// # Safety
///
/// - `src` must be valid for reads of `items * item_size` bytes.
/// - In `Increasing` mode, `dst` must be valid for writes of
///   `items * item_size` bytes; in `Constant` mode, for writes of
///   `item_size` bytes.
/// - The two regions must not overlap.
#[allow(clippy::arithmetic_side_effects)] // Safety: callers bound items/item_size by storage size
pub(crate) unsafe fn copy_items_out(
    dst: *mut u8,
    src: *const u8,
    items: usize,
    item_size: usize,
    mode: CopyMode,
) {
    match mode {
        CopyMode::Increasing => {
            // SAFETY: per contract, both regions cover items * item_size
            // bytes and do not overlap.
            unsafe { core::ptr::copy_nonoverlapping(src, dst, items * item_size) }
        }
        CopyMode::Constant => {
            for item in 0..items {
                for byte in 0..item_size {
                    // SAFETY: per contract, dst is an item_size-wide window
                    // (re-written volatile per item, register semantics) and
                    // src covers items * item_size bytes.
                    unsafe {
                        let value = src.add(item * item_size + byte).read();
                        core::ptr::write_volatile(dst.add(byte), value);
                    }
                }
            }
        }
    }
}
